//! Calendar months and date-only parsing
//!
//! A [`Month`] is the column key of the ledger grid. Every month has exactly
//! one canonical label (`"Jan-2022"`), used both as the spreadsheet header and
//! as the key of a record's monthly amounts.
//!
//! Dates entered by users are free text. [`parse_date_only`] accepts the
//! usual spellings and returns `None` for anything else; callers treat a
//! missing date as "no constraint".

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Three-letter month abbreviations, indexed by 0-based month
pub const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// A calendar month, stored as its first day
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Month(NaiveDate);

impl Month {
    /// Month for a year and a 0-based month index (0 = January)
    pub fn new(year: i32, month_index: u32) -> Option<Self> {
        if month_index >= 12 {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month_index + 1, 1).map(Self)
    }

    /// The month containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// 0-based month index
    pub fn index(&self) -> u32 {
        self.0.month0()
    }

    /// Start-of-month date, the value compared against maturity dates
    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// The following month, if representable
    pub fn succ(&self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(Self)
    }

    /// Canonical label, e.g. `"Jan-2022"`
    pub fn label(&self) -> String {
        format!("{}-{}", MONTH_ABBR[self.index() as usize], self.year())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month0() == self.index()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", MONTH_ABBR[self.index() as usize], self.year())
    }
}

/// Error returned when a string is not a month label
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthParseError(pub String);

impl fmt::Display for MonthParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a month label: {:?}", self.0)
    }
}

impl std::error::Error for MonthParseError {}

impl FromStr for Month {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_month_label(s).ok_or_else(|| MonthParseError(s.to_string()))
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.label()
    }
}

impl TryFrom<String> for Month {
    type Error = MonthParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Canonical label for a year and 0-based month index
pub fn month_label(year: i32, month_index: u32) -> Option<String> {
    Month::new(year, month_index).map(|m| m.label())
}

/// Parse a month label back into a [`Month`]
///
/// Accepts the canonical `"Mar-2023"` form. Abbreviations match
/// case-insensitively and a single space may stand in for the dash, which is
/// how locale-formatted headers (`"Mar 2023"`) look in older workbooks.
/// Returns `None` for anything else.
pub fn parse_month_label(label: &str) -> Option<Month> {
    let (abbr, year) = label.trim().split_once(|c: char| c == '-' || c == ' ')?;
    let index = MONTH_ABBR
        .iter()
        .position(|m| m.eq_ignore_ascii_case(abbr))?;
    if year.is_empty() || year.starts_with('+') {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    Month::new(year, index as u32)
}

/// Parse a user-entered date, discarding any time of day
///
/// Empty or unrecognised input yields `None`, which downstream code treats as
/// an unbounded (absent) date rather than an error.
pub fn parse_date_only(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .map(|dt| dt.date_naive())
        .ok()
}

/// True iff both dates are present and fall in the same calendar month
pub fn same_calendar_month(a: Option<NaiveDate>, b: Option<NaiveDate>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.year() == b.year() && a.month() == b.month(),
        _ => false,
    }
}
