//! Workbook parsing, summaries, and structure analysis.
//!
//! Parsing runs in two stages: a raw pass that collects physical rows exactly
//! as the sheet stores them, and a shaping pass that applies the row-model
//! contract (data rows exactly as wide as the header row). Structure analysis
//! reads the raw pass so its counts see the physical sheet.

use std::io::Cursor;

use calamine::{Data, DataType, Range, Reader, Xlsx};
use serde::Serialize;

use crate::error::{Result, SheetError};
use crate::model::{Cell, CellValue, Sheet, Workbook};

/// Rows echoed per sheet in a summary, headers included.
const SAMPLE_ROW_LIMIT: usize = 3;

/// Per-sheet view of a decoded workbook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetSummary {
    pub name: String,
    /// Row 0 rendered as strings; empty when the sheet has no header row.
    pub headers: Vec<String>,
    /// Physical rows, header included.
    pub total_rows: usize,
    /// Physical rows minus the header, floored at zero.
    pub data_rows: usize,
    /// First rows rendered as strings, bounded to three.
    pub sample_rows: Vec<Vec<String>>,
}

/// Workbook-level summary returned to transfer callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookSummary {
    pub sheet_count: usize,
    pub sheets: Vec<SheetSummary>,
}

/// Shape counts for one sheet, as reported by [`analyze_structure`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetStructure {
    pub index: usize,
    pub name: String,
    /// Physical row count.
    pub rows: usize,
    /// Cell count of the first physical row.
    pub columns: usize,
    /// `rows * columns`; over- or under-counts ragged sheets on purpose.
    pub estimated_cells: usize,
}

/// Whole-payload structure report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureSummary {
    pub file_size_bytes: usize,
    pub file_size_display: String,
    pub sheet_count: usize,
    pub total_rows: usize,
    pub total_estimated_cells: usize,
    pub sheets: Vec<SheetStructure>,
}

/// Parse an xlsx payload into the workbook model.
///
/// Fails with [`SheetError::Malformed`] when the bytes are not an xlsx
/// container at all. A header-less sheet decodes to a sheet with no rows
/// rather than failing.
pub fn decode_workbook(bytes: &[u8]) -> Result<Workbook> {
    let sheets = parse_sheets(bytes)?
        .into_iter()
        .map(shape_sheet)
        .collect();
    Ok(Workbook { sheets })
}

/// Summarize a decoded workbook: headers, row counts, first rows.
#[must_use]
pub fn summarize(workbook: &Workbook) -> WorkbookSummary {
    let sheets: Vec<SheetSummary> = workbook.sheets.iter().map(summarize_sheet).collect();
    WorkbookSummary {
        sheet_count: sheets.len(),
        sheets,
    }
}

/// Report the payload's physical shape without applying the row model.
///
/// The estimated cell count multiplies each sheet's physical row count by its
/// first-row width; rows below the first are not scanned, so ragged sheets
/// produce an estimate rather than an exact count.
pub fn analyze_structure(bytes: &[u8]) -> Result<StructureSummary> {
    let raw = parse_sheets(bytes)?;
    let sheets: Vec<SheetStructure> = raw
        .iter()
        .enumerate()
        .map(|(index, sheet)| {
            let rows = sheet.rows.len();
            let columns = sheet
                .rows
                .first()
                .map_or(0, |row| row.cells.iter().filter(|c| !c.value.is_blank()).count());
            SheetStructure {
                index,
                name: sheet.name.clone(),
                rows,
                columns,
                estimated_cells: rows * columns,
            }
        })
        .collect();
    Ok(StructureSummary {
        file_size_bytes: bytes.len(),
        file_size_display: format_size(bytes.len()),
        sheet_count: sheets.len(),
        total_rows: sheets.iter().map(|s| s.rows).sum(),
        total_estimated_cells: sheets.iter().map(|s| s.estimated_cells).sum(),
        sheets,
    })
}

/// Human rendering used in structure reports and transfer echoes.
#[must_use]
pub fn format_size(bytes: usize) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    let size = bytes as f64;
    if size < MIB {
        format!("{:.2} KB", size / 1024.0)
    } else {
        format!("{:.2} MB", size / MIB)
    }
}

struct RawSheet {
    name: String,
    rows: Vec<RawRow>,
}

struct RawRow {
    /// Absolute row index in the sheet; interior empty rows are skipped.
    index: u32,
    cells: Vec<Cell>,
}

fn parse_sheets(bytes: &[u8]) -> Result<Vec<RawSheet>> {
    let mut xlsx =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| SheetError::Malformed(e.to_string()))?;
    let names = xlsx.sheet_names();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = xlsx
            .worksheet_range(&name)
            .map_err(|e| SheetError::Malformed(e.to_string()))?;
        let formulas = xlsx
            .worksheet_formula(&name)
            .map_err(|e| SheetError::Malformed(e.to_string()))?;
        let rows = collect_rows(&range, &formulas);
        sheets.push(RawSheet { name, rows });
    }
    Ok(sheets)
}

/// Collect physical rows: every range row with at least one non-blank cell,
/// cells positioned at their absolute column, trailing blanks trimmed.
fn collect_rows(range: &Range<Data>, formulas: &Range<String>) -> Vec<RawRow> {
    let Some((first_row, first_col)) = range.start() else {
        return Vec::new();
    };
    let mut rows = Vec::new();
    for (offset, cells) in range.rows().enumerate() {
        let abs_row = first_row + offset as u32;
        let mut row: Vec<Cell> = vec![Cell::plain(CellValue::Blank); first_col as usize];
        for (col_offset, data) in cells.iter().enumerate() {
            let abs_col = first_col + col_offset as u32;
            row.push(decode_cell(data, formula_at(formulas, abs_row, abs_col)));
        }
        while row.last().is_some_and(|cell| cell.value.is_blank()) {
            row.pop();
        }
        if !row.is_empty() {
            rows.push(RawRow {
                index: abs_row,
                cells: row,
            });
        }
    }
    rows
}

fn decode_cell(data: &Data, formula: Option<&str>) -> Cell {
    // Formula text wins over the cached value, so formula cells round-trip
    // their source expression.
    if let Some(expr) = formula {
        return Cell::plain(CellValue::Formula(expr.to_string()));
    }
    let value = match data {
        Data::Empty => CellValue::Blank,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Float(value) => CellValue::Number(*value),
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Bool(flag) => CellValue::Bool(*flag),
        Data::DateTime(serial) => match data.as_datetime() {
            Some(timestamp) => CellValue::Text(timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Number(serial.as_f64()),
        },
        Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(text.clone()),
        Data::Error(_) => CellValue::Blank,
    };
    Cell::plain(value)
}

fn formula_at<'a>(formulas: &'a Range<String>, row: u32, col: u32) -> Option<&'a str> {
    let (first_row, first_col) = formulas.start()?;
    if row < first_row || col < first_col {
        return None;
    }
    let expr = formulas.get(((row - first_row) as usize, (col - first_col) as usize))?;
    if expr.is_empty() {
        None
    } else {
        Some(expr.as_str())
    }
}

/// Apply the row-model contract: row 0 is the header, data rows hold exactly
/// the header width. A sheet whose first physical row is not row 0 has no
/// header and therefore no data rows.
fn shape_sheet(raw: RawSheet) -> Sheet {
    let mut sheet = Sheet::new(raw.name);
    let mut rows = raw.rows.into_iter();
    let Some(header) = rows.next().filter(|row| row.index == 0) else {
        return sheet;
    };
    let width = header.cells.len();
    sheet.rows.push(header.cells);
    for row in rows {
        let mut cells = row.cells;
        cells.truncate(width);
        cells.resize(width, Cell::plain(CellValue::Blank));
        sheet.rows.push(cells);
    }
    sheet
}

fn summarize_sheet(sheet: &Sheet) -> SheetSummary {
    let total_rows = sheet.rows.len();
    let sample_rows = sheet
        .rows
        .iter()
        .take(SAMPLE_ROW_LIMIT)
        .map(|row| row.iter().map(|cell| cell.value.display_string()).collect())
        .collect();
    SheetSummary {
        name: sheet.name.clone(),
        headers: sheet.header_labels(),
        total_rows,
        data_rows: total_rows.saturating_sub(1),
        sample_rows,
    }
}
