//! Ledger schema: master fields, tracking window and header resolution
//!
//! [`Schema`] is the single source of truth for which months and which master
//! fields exist. The derivation engine, column definitions and the
//! spreadsheet codec all read their layout from here.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::month::{parse_month_label, Month};
use crate::record::{
    Bond, BondStatus, ClosedFlag, InterestFrequency, PurchaseType, EXPECTED_DAY_OPTIONS,
};
use crate::ConfigError;

/// Header of the derived accumulated-amount column
pub const ACCUMULATED_HEADER: &str = "Accumulated_Amount";

/// Most months a window may track: the XLSX column limit (16384) minus the
/// master columns and the accumulated column
pub const MAX_WINDOW_MONTHS: u32 = 16_384 - MasterField::ALL.len() as u32 - 1;

/// `Bond` value marking the synthesized aggregate row
pub const TOTAL_LABEL: &str = "TOTAL";

/// True if a `Bond` cell marks the aggregate row (trimmed, any case)
pub fn is_total_label(s: &str) -> bool {
    s.trim().eq_ignore_ascii_case(TOTAL_LABEL)
}

// ============================================================================
// Master Fields
// ============================================================================

/// Static attributes of a bond, in canonical column order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MasterField {
    Bond,
    ExpectedInterestDay,
    InterestRate,
    InterestFrequency,
    BondAmount,
    InvestedAmount,
    MaturityDate,
    Platform,
    Account,
    BankAccount,
    PurchaseType,
    Status,
    SettlementDate,
    Isin,
    Closed,
    Comment,
}

/// Storage and editing kind of a master field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    /// Free text interpreted as a date
    Date,
    /// One of a fixed set of display values
    Choice(&'static [&'static str]),
}

impl MasterField {
    /// Canonical order; export columns and import reconciliation follow it
    pub const ALL: [MasterField; 16] = [
        MasterField::Bond,
        MasterField::ExpectedInterestDay,
        MasterField::InterestRate,
        MasterField::InterestFrequency,
        MasterField::BondAmount,
        MasterField::InvestedAmount,
        MasterField::MaturityDate,
        MasterField::Platform,
        MasterField::Account,
        MasterField::BankAccount,
        MasterField::PurchaseType,
        MasterField::Status,
        MasterField::SettlementDate,
        MasterField::Isin,
        MasterField::Closed,
        MasterField::Comment,
    ];

    /// Header name used in spreadsheets and persisted records
    pub fn header(self) -> &'static str {
        match self {
            MasterField::Bond => "Bond",
            MasterField::ExpectedInterestDay => "Expected_Interest_Month_Date",
            MasterField::InterestRate => "Interest_Rate",
            MasterField::InterestFrequency => "Interest_Frequency",
            MasterField::BondAmount => "BondAmount",
            MasterField::InvestedAmount => "Invested_Amount",
            MasterField::MaturityDate => "MaturityDate",
            MasterField::Platform => "Platform",
            MasterField::Account => "Account",
            MasterField::BankAccount => "BankAccount",
            MasterField::PurchaseType => "BondPurchaseType",
            MasterField::Status => "Status",
            MasterField::SettlementDate => "Settlement Date",
            MasterField::Isin => "ISIN",
            MasterField::Closed => "Closed?",
            MasterField::Comment => "Comment",
        }
    }

    /// Human-readable column title
    pub fn label(self) -> &'static str {
        match self {
            MasterField::Bond => "Bond",
            MasterField::ExpectedInterestDay => "Expected Interest Day",
            MasterField::InterestRate => "Interest Rate %",
            MasterField::InterestFrequency => "Interest Frequency",
            MasterField::BondAmount => "Bond Amount",
            MasterField::InvestedAmount => "Invested Amount",
            MasterField::MaturityDate => "Maturity Date",
            MasterField::Platform => "Platform",
            MasterField::Account => "Account",
            MasterField::BankAccount => "BankAccount",
            MasterField::PurchaseType => "Purchase Type",
            MasterField::Status => "Status",
            MasterField::SettlementDate => "Settlement Date",
            MasterField::Isin => "ISIN",
            MasterField::Closed => "Closed?",
            MasterField::Comment => "Comment",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            MasterField::BondAmount | MasterField::InvestedAmount => FieldKind::Number,
            MasterField::MaturityDate | MasterField::SettlementDate => FieldKind::Date,
            MasterField::ExpectedInterestDay => FieldKind::Choice(&EXPECTED_DAY_OPTIONS),
            MasterField::InterestFrequency => FieldKind::Choice(InterestFrequency::OPTIONS),
            MasterField::PurchaseType => FieldKind::Choice(PurchaseType::OPTIONS),
            MasterField::Status => FieldKind::Choice(BondStatus::OPTIONS),
            MasterField::Closed => FieldKind::Choice(ClosedFlag::OPTIONS),
            _ => FieldKind::Text,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.kind() == FieldKind::Number
    }

    /// Resolve a header, including the legacy `SettlementDate` / `Closed` /
    /// `Comments` spellings
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        if let Some(field) = Self::ALL.iter().copied().find(|f| f.header() == header) {
            return Some(field);
        }
        match header {
            "SettlementDate" => Some(MasterField::SettlementDate),
            "Closed" => Some(MasterField::Closed),
            "Comments" => Some(MasterField::Comment),
            _ => None,
        }
    }
}

impl fmt::Display for MasterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

// ============================================================================
// Tracking Window
// ============================================================================

fn default_start_year() -> i32 {
    2022
}

fn default_start_month() -> u32 {
    1
}

fn default_window_months() -> u32 {
    96
}

/// Contiguous range of tracked months
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingWindow {
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    /// 1-based month the window starts in
    #[serde(default = "default_start_month")]
    pub start_month: u32,
    /// Number of months covered
    #[serde(default = "default_window_months")]
    pub months: u32,
}

impl Default for TrackingWindow {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            start_month: default_start_month(),
            months: default_window_months(),
        }
    }
}

impl TrackingWindow {
    pub fn new(start_year: i32, start_month: u32, months: u32) -> Self {
        Self {
            start_year,
            start_month,
            months,
        }
    }
}

// ============================================================================
// Schema
// ============================================================================

/// What a spreadsheet header refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderTarget {
    Master(MasterField),
    Month(Month),
    /// The derived accumulated column; never read back as data
    Accumulated,
    Unknown,
}

/// Canonical layout of the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    window: TrackingWindow,
    months: Vec<Month>,
}

impl Default for Schema {
    fn default() -> Self {
        let window = TrackingWindow::default();
        let months = std::iter::successors(Month::new(window.start_year, 0), Month::succ)
            .take(window.months as usize)
            .collect();
        Self { window, months }
    }
}

impl Schema {
    /// Build the schema for a tracking window
    pub fn new(window: TrackingWindow) -> Result<Self, ConfigError> {
        if window.months == 0 {
            return Err(ConfigError::InvalidWindow("window must cover at least one month".into()));
        }
        if window.months > MAX_WINDOW_MONTHS {
            return Err(ConfigError::InvalidWindow(format!(
                "{} months do not fit in one worksheet (at most {MAX_WINDOW_MONTHS})",
                window.months
            )));
        }
        let start = window
            .start_month
            .checked_sub(1)
            .and_then(|index| Month::new(window.start_year, index))
            .ok_or_else(|| {
                ConfigError::InvalidWindow(format!(
                    "invalid start month {}-{:02}",
                    window.start_year, window.start_month
                ))
            })?;

        let months: Vec<Month> = std::iter::successors(Some(start), Month::succ)
            .take(window.months as usize)
            .collect();
        if months.len() != window.months as usize {
            return Err(ConfigError::InvalidWindow(format!(
                "{} months from {} exceeds the calendar range",
                window.months, start
            )));
        }

        Ok(Self { window, months })
    }

    pub fn window(&self) -> TrackingWindow {
        self.window
    }

    /// Tracked months in order
    pub fn months(&self) -> &[Month] {
        &self.months
    }

    pub fn month_labels(&self) -> Vec<String> {
        self.months.iter().map(Month::label).collect()
    }

    pub fn first_month(&self) -> Month {
        self.months[0]
    }

    pub fn last_month(&self) -> Month {
        self.months[self.months.len() - 1]
    }

    pub fn contains(&self, month: Month) -> bool {
        month >= self.first_month() && month <= self.last_month()
    }

    /// Canonical master fields
    pub fn master_fields(&self) -> &'static [MasterField] {
        &MasterField::ALL
    }

    /// Full header row: master fields, months, then the accumulated column
    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = MasterField::ALL
            .iter()
            .map(|f| f.header().to_string())
            .collect();
        headers.extend(self.months.iter().map(Month::label));
        headers.push(ACCUMULATED_HEADER.to_string());
        headers
    }

    pub fn resolve_header(&self, header: &str) -> HeaderTarget {
        if let Some(field) = MasterField::from_header(header) {
            return HeaderTarget::Master(field);
        }
        if header.trim() == ACCUMULATED_HEADER {
            return HeaderTarget::Accumulated;
        }
        match parse_month_label(header) {
            Some(month) if self.contains(month) => HeaderTarget::Month(month),
            _ => HeaderTarget::Unknown,
        }
    }

    /// New record with master defaults and every month at 0
    pub fn empty_record(&self) -> Bond {
        let mut bond = Bond::default();
        bond.months = self.months.iter().map(|m| (*m, 0.0)).collect();
        bond
    }

    /// Bring a record onto this schema: missing months are added at 0 and
    /// months outside the window are dropped
    pub fn reconcile(&self, mut bond: Bond) -> Bond {
        bond.months.retain(|m, _| self.contains(*m));
        for month in &self.months {
            bond.months.entry(*month).or_insert(0.0);
        }
        bond
    }
}
