//! Derivation engine
//!
//! Pure functions over a record and the schema: the accumulated amount of a
//! bond, the maturity classification of each month cell, and ledger-wide
//! totals. Nothing here is cached or persisted; callers recompute on demand.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::month::{parse_month_label, same_calendar_month, Month};
use crate::record::Bond;
use crate::schema::Schema;

/// Position of a month cell relative to the bond's maturity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellClass {
    /// Before maturity, or the bond has no maturity date
    Normal,
    /// The calendar month the bond matures in
    Maturity,
    /// Month starts strictly after the maturity date
    PostMaturity,
}

impl CellClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellClass::Normal => "normal",
            CellClass::Maturity => "maturity",
            CellClass::PostMaturity => "post-maturity",
        }
    }

    /// CSS class used by table renderers (empty for normal cells)
    pub fn css_class(&self) -> &'static str {
        match self {
            CellClass::Normal => "",
            CellClass::Maturity => "maturity-cell",
            CellClass::PostMaturity => "post-maturity-cell",
        }
    }

    /// Months after maturity are read-only
    pub fn is_editable(&self) -> bool {
        !matches!(self, CellClass::PostMaturity)
    }
}

impl fmt::Display for CellClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sum of the bond's monthly amounts up to and including its maturity month
///
/// A month counts when the bond has no (parseable) maturity date, or when the
/// month's first day is on or before the maturity date.
pub fn accumulated_amount(schema: &Schema, bond: &Bond) -> f64 {
    let maturity = bond.maturity();
    schema
        .months()
        .iter()
        .filter(|m| maturity.map_or(true, |mat| m.first_day() <= mat))
        .map(|m| bond.amount(*m))
        .sum()
}

/// Classify one month cell of a bond
pub fn classify(bond: &Bond, month: Month) -> CellClass {
    let Some(maturity) = bond.maturity() else {
        return CellClass::Normal;
    };
    if same_calendar_month(Some(month.first_day()), Some(maturity)) {
        CellClass::Maturity
    } else if month.first_day() > maturity {
        CellClass::PostMaturity
    } else {
        CellClass::Normal
    }
}

/// Classify a cell by month label; labels that do not parse are `Normal`
pub fn cell_classification(bond: &Bond, month_label: &str) -> CellClass {
    parse_month_label(month_label).map_or(CellClass::Normal, |m| classify(bond, m))
}

/// Whether the month cell may be edited
pub fn is_month_editable(bond: &Bond, month: Month) -> bool {
    classify(bond, month).is_editable()
}

/// Aggregates shown in the footer and written to the TOTAL row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub invested: f64,
    /// Per-month totals in schema order
    pub months: Vec<(Month, f64)>,
    pub accumulated: f64,
}

impl LedgerTotals {
    pub fn month(&self, month: Month) -> f64 {
        self.months
            .iter()
            .find(|(m, _)| *m == month)
            .map_or(0.0, |(_, v)| *v)
    }
}

/// Column totals across all records
pub fn ledger_totals(schema: &Schema, bonds: &[Bond]) -> LedgerTotals {
    let invested = bonds
        .iter()
        .map(|b| if b.invested_amount.is_finite() { b.invested_amount } else { 0.0 })
        .sum();
    let months = schema
        .months()
        .iter()
        .map(|m| (*m, bonds.iter().map(|b| b.amount(*m)).sum()))
        .collect();
    let accumulated = bonds.iter().map(|b| accumulated_amount(schema, b)).sum();

    LedgerTotals {
        invested,
        months,
        accumulated,
    }
}
