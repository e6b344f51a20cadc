//! In-memory workbook model shared by the encoder and decoder.
//!
//! Workbooks are value-like: built fresh per request, consumed by one
//! serialization or one summary pass, never cached or shared.

/// Typed content of one spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// No stored content. A missing cell always decodes to this, never to an
    /// error.
    Blank,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Formula source text, without the leading `=`.
    Formula(String),
}

impl CellValue {
    /// Render the cell the way headers, summaries, and validation see it.
    ///
    /// Numbers are truncated toward zero and rendered as integer strings (the
    /// fractional part drops silently). Date-formatted cells never reach this
    /// as numbers: the decoder turns them into `Text` first.
    #[must_use]
    pub fn display_string(&self) -> String {
        match self {
            CellValue::Blank => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number(value) => format!("{}", value.trunc() as i64),
            CellValue::Bool(flag) => flag.to_string(),
            CellValue::Formula(expr) => expr.clone(),
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }
}

/// Style palette the encoder knows how to render.
///
/// Styling is encoder metadata only; the decoder reconstructs values and
/// reports every cell as `Plain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellStyle {
    #[default]
    Plain,
    /// Bold 12 pt on a light-blue fill. Header rows.
    Header,
    /// Bold 16 pt. Report titles.
    Title,
    /// Thin border on all four sides. Data rows.
    Bordered,
    /// Built-in date number format; marks a numeric cell as a calendar value.
    Date,
}

/// One cell: a value plus the style the encoder should render it with.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

impl Cell {
    #[must_use]
    pub fn new(value: CellValue, style: CellStyle) -> Self {
        Self { value, style }
    }

    /// Unstyled cell.
    #[must_use]
    pub fn plain(value: CellValue) -> Self {
        Self::new(value, CellStyle::Plain)
    }

    /// Text cell with the given style.
    #[must_use]
    pub fn text(text: impl Into<String>, style: CellStyle) -> Self {
        Self::new(CellValue::Text(text.into()), style)
    }
}

/// One named sheet: ordered rows of cells, row 0 conventionally the header.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Column count of the header row (row 0).
    #[must_use]
    pub fn header_width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Row 0 rendered as header labels.
    #[must_use]
    pub fn header_labels(&self) -> Vec<String> {
        self.rows.first().map_or_else(Vec::new, |row| {
            row.iter().map(|cell| cell.value.display_string()).collect()
        })
    }
}

/// Ordered sheets making up one document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Workbook holding exactly one sheet.
    #[must_use]
    pub fn single(sheet: Sheet) -> Self {
        Self {
            sheets: vec![sheet],
        }
    }

    #[must_use]
    pub fn first_sheet(&self) -> Option<&Sheet> {
        self.sheets.first()
    }
}
