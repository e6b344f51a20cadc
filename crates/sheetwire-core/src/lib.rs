//! Spreadsheet document model shared by the generator and reader services.
//!
//! The crate owns the workbook data model, the xlsx encoder and decoder, the
//! built-in sample and report datasets, and the error type every sheet
//! operation returns. Services layer transfer strategies and HTTP handling on
//! top of these primitives.

pub mod dataset;
pub mod decode;
pub mod encode;
pub mod error;
pub mod model;

pub use error::{Result, SheetError};
pub use model::{Cell, CellStyle, CellValue, Sheet, Workbook};
