//! Workbook serialization into the xlsx container.
//!
//! The container is a zip archive of hand-built XML parts: content types,
//! relationships, workbook index, a fixed stylesheet, and one worksheet part
//! per sheet. Text lands as inline strings, so no shared-string table is
//! needed.

use std::io::{Cursor, Seek, Write};

use chrono::{Datelike, NaiveDate};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;
use crate::model::{Cell, CellStyle, CellValue, Sheet, Workbook};

/// MIME type of the encoded container.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#
);

// Style table backing `CellStyle`. cellXfs order must stay in sync with
// `style_index`: 0 plain, 1 header, 2 title, 3 bordered, 4 date.
const STYLESHEET: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="3">"#,
    r#"<font><sz val="11"/><name val="Calibri"/></font>"#,
    r#"<font><b/><sz val="12"/><name val="Calibri"/></font>"#,
    r#"<font><b/><sz val="16"/><name val="Calibri"/></font>"#,
    r#"</fonts>"#,
    r#"<fills count="3">"#,
    r#"<fill><patternFill patternType="none"/></fill>"#,
    r#"<fill><patternFill patternType="gray125"/></fill>"#,
    r#"<fill><patternFill patternType="solid"><fgColor rgb="FFADD8E6"/></patternFill></fill>"#,
    r#"</fills>"#,
    r#"<borders count="2">"#,
    r#"<border><left/><right/><top/><bottom/><diagonal/></border>"#,
    r#"<border><left style="thin"/><right style="thin"/><top style="thin"/><bottom style="thin"/><diagonal/></border>"#,
    r#"</borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="5">"#,
    r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
    r#"<xf numFmtId="0" fontId="1" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1"/>"#,
    r#"<xf numFmtId="0" fontId="2" fillId="0" borderId="0" xfId="0" applyFont="1"/>"#,
    r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="1" xfId="0" applyBorder="1"/>"#,
    r#"<xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>"#,
    r#"</cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
    r#"</styleSheet>"#
);

const MIN_COLUMN_WIDTH: usize = 8;
const MAX_COLUMN_WIDTH: usize = 64;

// Days from 0001-01-01 to the xlsx serial epoch (1899-12-30).
const XLSX_EPOCH_DAYS: i64 = 693_594;

/// Serialize to an in-memory buffer.
pub fn encode_workbook(workbook: &Workbook) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    encode_workbook_into(workbook, &mut cursor)?;
    Ok(cursor.into_inner())
}

/// Serialize into any seekable sink. The zip writer back-patches entry
/// headers, so the sink must seek.
pub fn encode_workbook_into<W: Write + Seek>(workbook: &Workbook, sink: W) -> Result<()> {
    let mut zip = ZipWriter::new(sink);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let sheet_count = workbook.sheets.len();

    write_part(
        &mut zip,
        options,
        "[Content_Types].xml",
        &content_types_xml(sheet_count),
    )?;
    write_part(&mut zip, options, "_rels/.rels", ROOT_RELS)?;
    write_part(&mut zip, options, "xl/workbook.xml", &workbook_xml(workbook))?;
    write_part(
        &mut zip,
        options,
        "xl/_rels/workbook.xml.rels",
        &workbook_rels_xml(sheet_count),
    )?;
    write_part(&mut zip, options, "xl/styles.xml", STYLESHEET)?;
    for (index, sheet) in workbook.sheets.iter().enumerate() {
        let path = format!("xl/worksheets/sheet{}.xml", index + 1);
        write_part(&mut zip, options, &path, &worksheet_xml(sheet))?;
    }
    zip.finish()?;
    Ok(())
}

/// Serial value a `CellStyle::Date` cell stores: days since 1899-12-30.
#[must_use]
pub fn date_serial(date: NaiveDate) -> f64 {
    (i64::from(date.num_days_from_ce()) - XLSX_EPOCH_DAYS) as f64
}

fn write_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    path: &str,
    content: &str,
) -> Result<()> {
    zip.start_file(path, options)?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECL);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    for index in 0..sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            index + 1
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn workbook_xml(workbook: &Workbook) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str(XML_DECL);
    xml.push_str(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    xml.push_str("<sheets>");
    for (index, sheet) in workbook.sheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            xml_escape(&sheet.name),
            index + 1,
            index + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str(XML_DECL);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    for index in 0..sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            index + 1,
            index + 1
        ));
    }
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        sheet_count + 1
    ));
    xml.push_str("</Relationships>");
    xml
}

fn worksheet_xml(sheet: &Sheet) -> String {
    let mut xml = String::with_capacity(4096);
    xml.push_str(XML_DECL);
    xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);
    push_cols(&mut xml, sheet);
    xml.push_str("<sheetData>");
    for (row_index, row) in sheet.rows.iter().enumerate() {
        // Empty placeholder rows keep their index but are never written.
        if row.is_empty() {
            continue;
        }
        xml.push_str(&format!(r#"<row r="{}">"#, row_index + 1));
        for (col_index, cell) in row.iter().enumerate() {
            push_cell(&mut xml, row_index, col_index, cell);
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_cell(xml: &mut String, row: usize, col: usize, cell: &Cell) {
    let mut attrs = format!(r#" r="{}""#, cell_ref(row, col));
    let style = style_index(cell.style);
    if style != 0 {
        attrs.push_str(&format!(r#" s="{style}""#));
    }
    match &cell.value {
        CellValue::Blank => xml.push_str(&format!("<c{attrs}/>")),
        CellValue::Text(text) => xml.push_str(&format!(
            r#"<c{attrs} t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            xml_escape(text)
        )),
        CellValue::Number(value) => xml.push_str(&format!("<c{attrs}><v>{value}</v></c>")),
        CellValue::Bool(flag) => {
            xml.push_str(&format!(r#"<c{attrs} t="b"><v>{}</v></c>"#, u8::from(*flag)));
        }
        // The zero placeholder keeps the cell inside the value grid; readers
        // that want the result must evaluate the formula themselves.
        CellValue::Formula(expr) => xml.push_str(&format!(
            "<c{attrs}><f>{}</f><v>0</v></c>",
            xml_escape(expr)
        )),
    }
}

fn push_cols(xml: &mut String, sheet: &Sheet) {
    let widths = column_widths(sheet);
    if widths.is_empty() {
        return;
    }
    xml.push_str("<cols>");
    for (index, width) in widths.iter().enumerate() {
        xml.push_str(&format!(
            r#"<col min="{0}" max="{0}" width="{1}" customWidth="1"/>"#,
            index + 1,
            width
        ));
    }
    xml.push_str("</cols>");
}

/// Auto-size substitute: widths from the widest rendered string per column,
/// computed once per sheet after all rows are known.
fn column_widths(sheet: &Sheet) -> Vec<usize> {
    let columns = sheet.rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..columns)
        .map(|col| {
            let widest = sheet
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| rendered_width(&cell.value.display_string()))
                .max()
                .unwrap_or(0);
            (widest + 2).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
        })
        .collect()
}

// CJK glyphs render roughly double-width.
fn rendered_width(text: &str) -> usize {
    text.chars()
        .map(|c| if (c as u32) >= 0x2E80 { 2 } else { 1 })
        .sum()
}

fn style_index(style: CellStyle) -> usize {
    match style {
        CellStyle::Plain => 0,
        CellStyle::Header => 1,
        CellStyle::Title => 2,
        CellStyle::Bordered => 3,
        CellStyle::Date => 4,
    }
}

fn cell_ref(row: usize, col: usize) -> String {
    format!("{}{}", col_letters(col), row + 1)
}

fn col_letters(index: usize) -> String {
    let mut n = index;
    let mut letters = String::new();
    loop {
        letters.insert(0, char::from(b'A' + (n % 26) as u8));
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters
}

fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_letters() {
        assert_eq!(col_letters(0), "A");
        assert_eq!(col_letters(25), "Z");
        assert_eq!(col_letters(26), "AA");
        assert_eq!(col_letters(27), "AB");
        assert_eq!(col_letters(52), "BA");
    }

    #[test]
    fn test_cell_ref() {
        assert_eq!(cell_ref(0, 0), "A1");
        assert_eq!(cell_ref(10, 5), "F11");
        assert_eq!(cell_ref(2, 26), "AA3");
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a<b>&\"c\"'d'"), "a&lt;b&gt;&amp;&quot;c&quot;&apos;d&apos;");
        assert_eq!(xml_escape("薪資"), "薪資");
    }

    #[test]
    fn test_date_serial_epochs() {
        let unix_epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_serial(unix_epoch), 25569.0);

        let hire_date = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        assert_eq!(date_serial(hire_date), 44941.0);
    }

    #[test]
    fn test_worksheet_xml_fragments() {
        let mut sheet = Sheet::new("S");
        sheet.rows.push(vec![
            Cell::text("名", CellStyle::Header),
            Cell::plain(CellValue::Number(3.5)),
        ]);
        sheet.rows.push(Vec::new());
        sheet.rows.push(vec![
            Cell::plain(CellValue::Bool(true)),
            Cell::plain(CellValue::Blank),
        ]);

        let xml = worksheet_xml(&sheet);
        assert!(xml.contains(r#"<row r="1">"#));
        assert!(!xml.contains(r#"<row r="2">"#));
        assert!(xml.contains(r#"<row r="3">"#));
        assert!(xml.contains(r#"<c r="A1" s="1" t="inlineStr"><is><t xml:space="preserve">名</t></is></c>"#));
        assert!(xml.contains(r#"<c r="B1"><v>3.5</v></c>"#));
        assert!(xml.contains(r#"<c r="A3" t="b"><v>1</v></c>"#));
        assert!(xml.contains(r#"<c r="B3"/>"#));
    }

    #[test]
    fn test_column_widths_clamped() {
        let mut sheet = Sheet::new("S");
        sheet.rows.push(vec![
            Cell::text("x", CellStyle::Plain),
            Cell::text("部門名稱部門名稱部門名稱部門名稱部門名稱部門名稱部門名稱部門名稱", CellStyle::Plain),
        ]);

        let widths = column_widths(&sheet);
        assert_eq!(widths.len(), 2);
        assert_eq!(widths[0], MIN_COLUMN_WIDTH);
        assert_eq!(widths[1], MAX_COLUMN_WIDTH);
    }

    #[test]
    fn test_encode_produces_zip_container() {
        let mut sheet = Sheet::new("Only");
        sheet.rows.push(vec![Cell::text("h", CellStyle::Header)]);
        let bytes = encode_workbook(&Workbook::single(sheet)).unwrap();

        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..4], b"PK\x03\x04");
    }
}
