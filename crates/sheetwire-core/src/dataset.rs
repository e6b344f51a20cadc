//! Fixed template datasets and the workbook builders that render them.
//!
//! The datasets are immutable values injected into the services at startup;
//! nothing in the encoder reaches for globals.

use chrono::NaiveDateTime;

use crate::error::{Result, SheetError};
use crate::model::{Cell, CellStyle, Sheet, Workbook};

/// Header labels of the employee sample template, also the expected sequence
/// for the round-trip header validation.
pub const EMPLOYEE_HEADERS: [&str; 6] = ["ID", "姓名", "部門", "薪資", "入職日期", "狀態"];

const EMPLOYEE_ROWS: [[&str; 6]; 10] = [
    ["1", "張三", "資訊部", "50000", "2023-01-15", "在職"],
    ["2", "李四", "業務部", "45000", "2023-02-20", "在職"],
    ["3", "王五", "人資部", "48000", "2023-03-10", "在職"],
    ["4", "趙六", "財務部", "52000", "2023-04-05", "在職"],
    ["5", "錢七", "研發部", "55000", "2023-05-12", "在職"],
    ["6", "孫八", "行銷部", "47000", "2023-06-18", "在職"],
    ["7", "周九", "客服部", "42000", "2023-07-22", "在職"],
    ["8", "吳十", "採購部", "49000", "2023-08-30", "在職"],
    ["9", "鄭一", "品管部", "46000", "2023-09-15", "在職"],
    ["10", "馮二", "生產部", "44000", "2023-10-01", "在職"],
];

const REPORT_HEADERS: [&str; 5] = ["項目", "數量", "金額", "百分比", "備註"];

const REPORT_ROWS: [[&str; 5]; 5] = [
    ["收入", "100", "1000000", "65%", "主要營收來源"],
    ["支出", "50", "350000", "23%", "營運成本"],
    ["利潤", "50", "650000", "42%", "淨利潤"],
    ["稅務", "15", "97500", "6.5%", "營業稅等"],
    ["其他", "10", "52500", "3.5%", "雜項費用"],
];

/// Column labels and rows for the employee sample template.
#[derive(Debug, Clone)]
pub struct SampleDataset {
    pub sheet_name: &'static str,
    pub headers: &'static [&'static str],
    pub rows: &'static [[&'static str; 6]],
}

impl SampleDataset {
    /// The employee table every sample generation request serves.
    #[must_use]
    pub fn employees() -> Self {
        Self {
            sheet_name: "Sample Data",
            headers: &EMPLOYEE_HEADERS,
            rows: &EMPLOYEE_ROWS,
        }
    }
}

/// Title label, column labels, and rows for the report template.
#[derive(Debug, Clone)]
pub struct ReportTemplate {
    pub kind_label: &'static str,
    pub headers: &'static [&'static str],
    pub rows: &'static [[&'static str; 5]],
}

impl ReportTemplate {
    /// The monthly summary report.
    #[must_use]
    pub fn monthly() -> Self {
        Self {
            kind_label: "月度",
            headers: &REPORT_HEADERS,
            rows: &REPORT_ROWS,
        }
    }
}

/// Build the full sample workbook: one header row plus ten bordered data rows.
#[must_use]
pub fn sample_workbook(dataset: &SampleDataset) -> Workbook {
    let mut sheet = Sheet::new(dataset.sheet_name);
    sheet.rows.push(header_row(dataset.headers));
    for values in dataset.rows {
        sheet.rows.push(data_row(values));
    }
    Workbook::single(sheet)
}

/// Build the titled report workbook. Row 0 carries the title with the
/// injected timestamp, row 1 stays empty, row 2 carries the column headers.
#[must_use]
pub fn report_workbook(template: &ReportTemplate, generated_at: NaiveDateTime) -> Workbook {
    let mut sheet = Sheet::new(format!("{} Report", template.kind_label));
    let title = format!(
        "{} 報表 - {}",
        template.kind_label,
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    sheet.rows.push(vec![Cell::text(title, CellStyle::Title)]);
    sheet.rows.push(Vec::new());
    sheet.rows.push(header_row(template.headers));
    for values in template.rows {
        sheet.rows.push(data_row(values));
    }
    Workbook::single(sheet)
}

/// Build the header-only workbook the reader uploads for filling.
#[must_use]
pub fn header_template(dataset: &SampleDataset) -> Workbook {
    let mut sheet = Sheet::new(dataset.sheet_name);
    sheet.rows.push(header_row(dataset.headers));
    Workbook::single(sheet)
}

/// Write the dataset's rows into `workbook` starting at row index 1.
///
/// Row 0 keeps its decoded values and gets header styling back (decoding
/// drops style metadata). Rows 1..=10 are replaced in place; rows past the
/// dataset's extent survive. Fails with [`SheetError::EmptySheet`] when the
/// first sheet has no rows at all, before anything is written.
pub fn fill_sample_rows(workbook: &mut Workbook, dataset: &SampleDataset) -> Result<()> {
    let sheet = workbook
        .sheets
        .first_mut()
        .ok_or_else(|| SheetError::Malformed("workbook contains no sheets".to_string()))?;
    if sheet.rows.is_empty() {
        return Err(SheetError::EmptySheet(sheet.name.clone()));
    }
    for cell in &mut sheet.rows[0] {
        cell.style = CellStyle::Header;
    }
    for (offset, values) in dataset.rows.iter().enumerate() {
        let index = offset + 1;
        let row = data_row(values);
        if index < sheet.rows.len() {
            sheet.rows[index] = row;
        } else {
            sheet.rows.push(row);
        }
    }
    Ok(())
}

fn header_row(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::text(*label, CellStyle::Header))
        .collect()
}

fn data_row(values: &[&str]) -> Vec<Cell> {
    values
        .iter()
        .map(|value| Cell::text(*value, CellStyle::Bordered))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn report_timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_sample_workbook_shape() {
        let workbook = sample_workbook(&SampleDataset::employees());
        let sheet = workbook.first_sheet().unwrap();

        assert_eq!(sheet.name, "Sample Data");
        assert_eq!(sheet.rows.len(), 11);
        assert_eq!(sheet.header_labels(), EMPLOYEE_HEADERS.to_vec());
        assert!(sheet.rows.iter().all(|row| row.len() == 6));
        assert_eq!(sheet.rows[1][1].value.display_string(), "張三");
        assert_eq!(sheet.rows[10][4].value.display_string(), "2023-10-01");
    }

    #[test]
    fn test_report_workbook_shape() {
        let workbook = report_workbook(&ReportTemplate::monthly(), report_timestamp());
        let sheet = workbook.first_sheet().unwrap();

        assert_eq!(sheet.name, "月度 Report");
        assert_eq!(sheet.rows.len(), 8);
        assert_eq!(
            sheet.rows[0][0].value.display_string(),
            "月度 報表 - 2024-03-01 09:30:00"
        );
        assert!(sheet.rows[1].is_empty());
        assert_eq!(sheet.rows[2].len(), 5);
        assert_eq!(sheet.rows[3][0].value.display_string(), "收入");
        assert_eq!(sheet.rows[7][4].value.display_string(), "雜項費用");
    }

    #[test]
    fn test_header_template_is_header_only() {
        let workbook = header_template(&SampleDataset::employees());
        let sheet = workbook.first_sheet().unwrap();

        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.header_labels(), EMPLOYEE_HEADERS.to_vec());
        assert!(sheet.rows[0]
            .iter()
            .all(|cell| cell.style == CellStyle::Header));
    }

    #[test]
    fn test_fill_appends_ten_rows_after_header() {
        let dataset = SampleDataset::employees();
        let mut workbook = header_template(&dataset);

        fill_sample_rows(&mut workbook, &dataset).unwrap();

        let sheet = workbook.first_sheet().unwrap();
        assert_eq!(sheet.rows.len(), 11);
        assert_eq!(sheet.header_labels(), EMPLOYEE_HEADERS.to_vec());
        assert_eq!(sheet.rows[1][0].value.display_string(), "1");
        assert_eq!(sheet.rows[10][0].value.display_string(), "10");
        assert!(sheet.rows[1..]
            .iter()
            .all(|row| row.iter().all(|cell| cell.style == CellStyle::Bordered)));
    }

    #[test]
    fn test_fill_restyles_decoded_header() {
        let dataset = SampleDataset::employees();
        let mut sheet = Sheet::new(dataset.sheet_name);
        sheet.rows.push(
            dataset
                .headers
                .iter()
                .map(|label| Cell::text(*label, CellStyle::Plain))
                .collect(),
        );
        let mut workbook = Workbook::single(sheet);

        fill_sample_rows(&mut workbook, &dataset).unwrap();

        let header = &workbook.first_sheet().unwrap().rows[0];
        assert_eq!(header.len(), 6);
        assert!(header.iter().all(|cell| cell.style == CellStyle::Header));
    }

    #[test]
    fn test_fill_overwrites_in_place_and_keeps_tail() {
        let dataset = SampleDataset::employees();
        let mut workbook = header_template(&dataset);
        let sheet = &mut workbook.sheets[0];
        for i in 0..12 {
            sheet.rows.push(vec![Cell::text(format!("old-{i}"), CellStyle::Plain)]);
        }

        fill_sample_rows(&mut workbook, &dataset).unwrap();

        let sheet = workbook.first_sheet().unwrap();
        assert_eq!(sheet.rows.len(), 13);
        assert_eq!(sheet.rows[1][0].value.display_string(), "1");
        assert_eq!(sheet.rows[11][0].value.display_string(), "old-10");
        assert_eq!(sheet.rows[12][0].value.display_string(), "old-11");
    }

    #[test]
    fn test_fill_rejects_empty_sheet() {
        let dataset = SampleDataset::employees();
        let mut workbook = Workbook::single(Sheet::new("Empty"));

        let err = fill_sample_rows(&mut workbook, &dataset).unwrap_err();
        assert!(matches!(err, SheetError::EmptySheet(name) if name == "Empty"));
        assert!(workbook.first_sheet().unwrap().rows.is_empty());
    }

    #[test]
    fn test_fill_rejects_sheetless_workbook() {
        let dataset = SampleDataset::employees();
        let mut workbook = Workbook::new();

        let err = fill_sample_rows(&mut workbook, &dataset).unwrap_err();
        assert!(matches!(err, SheetError::Malformed(_)));
    }
}
