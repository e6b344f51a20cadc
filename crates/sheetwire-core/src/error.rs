//! Codec error taxonomy.

use thiserror::Error;

/// Errors raised by the workbook codec.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Malformed workbook: {0}")]
    Malformed(String),

    #[error("Sheet '{0}' has no rows to fill")]
    EmptySheet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<calamine::XlsxError> for SheetError {
    fn from(err: calamine::XlsxError) -> Self {
        SheetError::Malformed(err.to_string())
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, SheetError>;
