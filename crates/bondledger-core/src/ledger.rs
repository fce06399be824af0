//! The ledger: one owned record collection plus commit observers
//!
//! Every mutation builds the next collection, commits it whole and then hands
//! the committed snapshot to each registered [`LedgerObserver`]. Persistence is
//! just one such observer (see [`crate::store::Persist`]).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::derivation::{accumulated_amount, classify, ledger_totals, CellClass, LedgerTotals};
use crate::month::Month;
use crate::record::{coerce_amount, Bond, FieldValue};
use crate::schema::{is_total_label, HeaderTarget, MasterField, Schema};
use crate::store::{LedgerStore, Persist};
use crate::{LedgerError, StoreError};

/// Sort key for records without a maturity date
const FAR_FUTURE: (i32, u32, u32) = (2100, 1, 1);

/// Receives every committed snapshot of the ledger
pub trait LedgerObserver {
    fn committed(&mut self, bonds: &[Bond]) -> Result<(), StoreError>;

    /// The ledger was cleared; defaults to committing an empty snapshot
    fn cleared(&mut self) -> Result<(), StoreError> {
        self.committed(&[])
    }
}

// ============================================================================
// Filtering
// ============================================================================

/// Case-insensitive substring filters; every non-empty filter must match
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerFilter {
    pub bond: String,
    pub platform: String,
    pub isin: String,
}

impl LedgerFilter {
    pub fn is_empty(&self) -> bool {
        self.bond.is_empty() && self.platform.is_empty() && self.isin.is_empty()
    }

    pub fn matches(&self, bond: &Bond) -> bool {
        contains_ci(&bond.name, &self.bond)
            && contains_ci(&bond.platform, &self.platform)
            && contains_ci(&bond.isin, &self.isin)
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// One row of a filtered view
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LedgerRow<'a> {
    /// Position in the underlying collection, for follow-up edits
    pub index: usize,
    pub bond: &'a Bond,
    pub accumulated: f64,
}

// ============================================================================
// Ledger
// ============================================================================

pub struct Ledger {
    schema: Schema,
    bonds: Vec<Bond>,
    observers: Vec<Box<dyn LedgerObserver>>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("schema", &self.schema)
            .field("bonds", &self.bonds)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Ledger {
    /// Empty ledger with no observers
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            bonds: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Ledger seeded with records, reconciled onto the schema
    pub fn with_records(schema: Schema, bonds: Vec<Bond>) -> Self {
        let bonds = prepare(&schema, bonds);
        Self {
            schema,
            bonds,
            observers: Vec::new(),
        }
    }

    /// Load from a store and persist every later commit back to it
    pub fn open<S>(schema: Schema, store: S) -> Result<Self, LedgerError>
    where
        S: LedgerStore + 'static,
    {
        let bonds = store.load()?.unwrap_or_default();
        debug!(namespace = store.namespace(), records = bonds.len(), "opened ledger");
        let mut ledger = Self::with_records(schema, bonds);
        ledger.observe(Persist::new(store));
        Ok(ledger)
    }

    pub fn observe(&mut self, observer: impl LedgerObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn get(&self, index: usize) -> Option<&Bond> {
        self.bonds.get(index)
    }

    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Append a record; returns its index
    pub fn add(&mut self, bond: Bond) -> Result<usize, LedgerError> {
        check_name(&bond)?;
        let mut next = self.bonds.clone();
        next.push(self.schema.reconcile(bond));
        let index = next.len() - 1;
        self.commit(next)?;
        Ok(index)
    }

    /// Append a record with master defaults and every month at 0
    pub fn add_empty(&mut self) -> Result<usize, LedgerError> {
        let bond = self.schema.empty_record();
        self.add(bond)
    }

    pub fn set_field(
        &mut self,
        index: usize,
        field: MasterField,
        value: impl Into<FieldValue>,
    ) -> Result<(), LedgerError> {
        self.check_index(index)?;
        let mut next = self.bonds.clone();
        next[index].set(field, value);
        check_name(&next[index])?;
        self.commit(next)
    }

    /// Set a month amount; months after the bond's maturity are locked
    pub fn set_month(&mut self, index: usize, month: Month, amount: f64) -> Result<(), LedgerError> {
        let bond = self.bonds.get(index).ok_or(LedgerError::NoSuchRecord(index))?;
        check_month(&self.schema, bond, month)?;
        let mut next = self.bonds.clone();
        next[index].set_amount(month, amount);
        self.commit(next)
    }

    /// Edit a cell addressed by its column header (see [`apply_cell`])
    pub fn set_cell(&mut self, index: usize, header: &str, raw: &str) -> Result<(), LedgerError> {
        let mut next = self.bonds.clone();
        let bond = next.get_mut(index).ok_or(LedgerError::NoSuchRecord(index))?;
        apply_cell(&self.schema, bond, header, raw)?;
        self.commit(next)
    }

    /// Replace every record, as an import does
    pub fn replace_all(&mut self, bonds: Vec<Bond>) -> Result<(), LedgerError> {
        let next = prepare(&self.schema, bonds);
        self.commit(next)
    }

    /// Remove all records and tell observers the ledger is gone
    pub fn clear(&mut self) -> Result<(), LedgerError> {
        self.bonds = Vec::new();
        debug!("ledger cleared");
        self.notify(|observer, _| observer.cleared())
    }

    fn check_index(&self, index: usize) -> Result<(), LedgerError> {
        if index < self.bonds.len() {
            Ok(())
        } else {
            Err(LedgerError::NoSuchRecord(index))
        }
    }

    /// Commit `next` and notify observers
    ///
    /// The new state stays committed even if an observer fails; the first
    /// failure is returned after every observer has run.
    fn commit(&mut self, next: Vec<Bond>) -> Result<(), LedgerError> {
        self.bonds = next;
        self.notify(|observer, bonds| observer.committed(bonds))
    }

    fn notify<F>(&mut self, mut f: F) -> Result<(), LedgerError>
    where
        F: FnMut(&mut dyn LedgerObserver, &[Bond]) -> Result<(), StoreError>,
    {
        let mut first_error = None;
        for observer in &mut self.observers {
            if let Err(e) = f(observer.as_mut(), &self.bonds) {
                warn!(error = %e, "ledger observer failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(LedgerError::Store(e)),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Derived views
    // ------------------------------------------------------------------------

    pub fn accumulated(&self, index: usize) -> Option<f64> {
        self.bonds
            .get(index)
            .map(|b| accumulated_amount(&self.schema, b))
    }

    pub fn classify(&self, index: usize, month: Month) -> Option<CellClass> {
        self.bonds.get(index).map(|b| classify(b, month))
    }

    pub fn totals(&self) -> LedgerTotals {
        ledger_totals(&self.schema, &self.bonds)
    }

    /// Totals over the rows a filter keeps
    pub fn filtered_totals(&self, filter: &LedgerFilter) -> LedgerTotals {
        let kept: Vec<Bond> = self
            .bonds
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        ledger_totals(&self.schema, &kept)
    }

    /// Filtered rows sorted by maturity date; undated bonds sort last
    pub fn view(&self, filter: &LedgerFilter) -> Vec<LedgerRow<'_>> {
        let mut rows: Vec<LedgerRow<'_>> = self
            .bonds
            .iter()
            .enumerate()
            .filter(|(_, b)| filter.matches(b))
            .map(|(index, bond)| LedgerRow {
                index,
                bond,
                accumulated: accumulated_amount(&self.schema, bond),
            })
            .collect();
        rows.sort_by_key(|row| maturity_sort_key(row.bond));
        rows
    }
}

/// Apply one cell edit to a record
///
/// Month and numeric cells coerce `raw` to a number (0 when it is not one);
/// other master fields take it as text. The derived accumulated column,
/// headers outside the schema and a `TOTAL` bond name are rejected.
pub fn apply_cell(schema: &Schema, bond: &mut Bond, header: &str, raw: &str) -> Result<(), LedgerError> {
    match schema.resolve_header(header) {
        HeaderTarget::Master(field) if field.is_numeric() => bond.set(field, coerce_amount(raw)),
        HeaderTarget::Master(MasterField::Bond) if is_total_label(raw) => {
            return Err(LedgerError::ReservedName(raw.trim().to_string()));
        }
        HeaderTarget::Master(field) => bond.set(field, raw),
        HeaderTarget::Month(month) => {
            check_month(schema, bond, month)?;
            bond.set_amount(month, coerce_amount(raw));
        }
        HeaderTarget::Accumulated | HeaderTarget::Unknown => {
            return Err(LedgerError::UnknownColumn(header.to_string()));
        }
    }
    Ok(())
}

/// `TOTAL` in any case is the aggregate row marker and never a record name
fn check_name(bond: &Bond) -> Result<(), LedgerError> {
    if bond.is_total_marker() {
        Err(LedgerError::ReservedName(bond.name.trim().to_string()))
    } else {
        Ok(())
    }
}

fn check_month(schema: &Schema, bond: &Bond, month: Month) -> Result<(), LedgerError> {
    if !schema.contains(month) {
        return Err(LedgerError::UnknownMonth(month.label()));
    }
    if !classify(bond, month).is_editable() {
        return Err(LedgerError::MonthLocked {
            bond: bond.name.clone(),
            month: month.label(),
        });
    }
    Ok(())
}

fn maturity_sort_key(bond: &Bond) -> NaiveDate {
    bond.maturity().unwrap_or_else(|| {
        let (y, m, d) = FAR_FUTURE;
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MAX)
    })
}

/// Reconcile onto the schema and drop aggregate rows
fn prepare(schema: &Schema, bonds: Vec<Bond>) -> Vec<Bond> {
    bonds
        .into_iter()
        .filter(|b| !b.is_total_marker())
        .map(|b| schema.reconcile(b))
        .collect()
}
