//! # bondledger-excel
//!
//! Spreadsheet codec for bondledger.
//!
//! - [`ExcelExporter`] writes the ledger as one XLSX worksheet with a
//!   synthesized TOTAL row (`rust_xlsxwriter`)
//! - [`import_workbook`] reads `.xlsx` / `.xls` bytes back into records
//!   (`calamine`)
//! - [`records_from_sheet`] applies the same import rules to a sheet decoded
//!   elsewhere, e.g. by a JavaScript workbook library
//!
//! ## Example
//!
//! ```rust
//! use bondledger_core::{Bond, MasterField, Schema};
//! use bondledger_excel::{import_workbook, ExcelExporter};
//!
//! let schema = Schema::default();
//! let bonds = vec![schema.empty_record().with(MasterField::Bond, "Acme 10% 2027")];
//!
//! let bytes = ExcelExporter::new().export(&schema, &bonds).unwrap();
//! let back = import_workbook(&schema, &bytes).unwrap();
//! assert_eq!(back, bonds);
//! ```

use thiserror::Error;

pub mod cell;
pub mod export;
pub mod import;

pub use cell::{CellContent, CellScalar};
pub use export::{col_to_letter, ExcelExporter};
pub use import::{import_workbook, read_first_sheet, records_from_sheet, DecodedSheet};

/// Spreadsheet codec error
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Cannot read workbook: {0}")]
    Read(String),

    #[error("Workbook has no worksheet")]
    NoWorksheet,

    #[error("Cannot write workbook: {0}")]
    Write(String),

    #[error("Invalid cell data: {0}")]
    InvalidCells(String),
}
