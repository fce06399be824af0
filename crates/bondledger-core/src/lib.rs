//! # bondledger-core
//!
//! Domain model for tracking a portfolio of fixed-income bonds month by month.
//!
//! This crate provides:
//! - Calendar months and lenient date parsing (`month`)
//! - The record type and its master fields (`record`, `schema`)
//! - The derivation engine: accumulated amounts, maturity classes, totals
//! - The ledger container with commit observers, and whole-ledger stores
//! - Column definitions for table renderers, and TOML configuration
//!
//! ## Example
//!
//! ```rust
//! use bondledger_core::{Ledger, MasterField, Month, Schema};
//!
//! let mut ledger = Ledger::new(Schema::default());
//! let i = ledger.add_empty().unwrap();
//! ledger.set_field(i, MasterField::Bond, "Acme 10% 2023").unwrap();
//! ledger.set_field(i, MasterField::MaturityDate, "2023-03-15").unwrap();
//!
//! let march: Month = "Mar-2023".parse().unwrap();
//! ledger.set_month(i, march, 850.0).unwrap();
//! assert_eq!(ledger.accumulated(i), Some(850.0));
//!
//! // months after maturity are locked
//! let april: Month = "Apr-2023".parse().unwrap();
//! assert!(ledger.set_month(i, april, 1.0).is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

pub mod columns;
pub mod config;
pub mod derivation;
pub mod ledger;
pub mod month;
pub mod record;
pub mod schema;
pub mod store;

pub use columns::{column_defs, ColumnDef, ColumnKind, Editable, Pin};
pub use config::{ExportConfig, LedgerConfig, StorageConfig};
pub use derivation::{
    accumulated_amount, cell_classification, classify, is_month_editable, ledger_totals,
    CellClass, LedgerTotals,
};
pub use ledger::{apply_cell, Ledger, LedgerFilter, LedgerObserver, LedgerRow};
pub use month::{month_label, parse_date_only, parse_month_label, Month};
pub use record::{
    coerce_amount, format_number, Bond, BondStatus, ClosedFlag, FieldValue, InterestFrequency,
    PurchaseType,
};
pub use schema::{
    is_total_label, FieldKind, HeaderTarget, MasterField, Schema, TrackingWindow,
    ACCUMULATED_HEADER, MAX_WINDOW_MONTHS, TOTAL_LABEL,
};
pub use store::{JsonFileStore, LedgerStore, MemoryStore, Persist, DEFAULT_NAMESPACE};

// ============================================================================
// Errors
// ============================================================================

/// Ledger edit error
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("No record at index {0}")]
    NoSuchRecord(usize),

    #[error("Month not tracked: {0}")]
    UnknownMonth(String),

    #[error("Month {month} is after the maturity of {bond:?} and cannot be edited")]
    MonthLocked { bond: String, month: String },

    #[error("Not an editable column: {0}")]
    UnknownColumn(String),

    #[error("Bond name {0:?} is reserved for the totals row")]
    ReservedName(String),

    #[error("Persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// Persistence error
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid tracking window: {0}")]
    InvalidWindow(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let err = LedgerError::MonthLocked {
            bond: "Acme".into(),
            month: "Apr-2023".into(),
        };
        assert_eq!(
            err.to_string(),
            "Month Apr-2023 is after the maturity of \"Acme\" and cannot be edited"
        );
        assert_eq!(LedgerError::NoSuchRecord(4).to_string(), "No record at index 4");
        assert_eq!(
            LedgerError::ReservedName("Total".into()).to_string(),
            "Bond name \"Total\" is reserved for the totals row"
        );

        let err: LedgerError = StoreError::Unavailable("no localStorage".into()).into();
        assert!(err.to_string().contains("no localStorage"));
    }
}
