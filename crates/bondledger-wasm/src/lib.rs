//! WebAssembly bindings for the bondledger bond tracker
//!
//! This crate exposes a [`BondLedger`] handle to JavaScript. The handle owns
//! the ledger, persists every change to `localStorage`, and answers the
//! rendering layer's questions: column definitions, accumulated amounts,
//! cell classes and footer totals. Spreadsheet bytes go in and out through
//! `export_xlsx` / `import_xlsx`.

mod storage;

use serde_json::{json, Map, Value};
use tracing::warn;
use wasm_bindgen::prelude::*;

use bondledger_core::{
    column_defs, Ledger, LedgerFilter, LedgerStore, MasterField, Month, Persist, Schema,
};
use bondledger_excel::{import_workbook, records_from_sheet, DecodedSheet, ExcelExporter};

pub use storage::LocalStorageStore;

/// Initialize panic hook for better error messages in console
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// ============================================================================
// Ledger Handle
// ============================================================================

/// A bond ledger persisted in the browser
#[wasm_bindgen]
pub struct BondLedger {
    ledger: Ledger,
    exporter: ExcelExporter,
    last_error: Option<String>,
}

#[wasm_bindgen]
impl BondLedger {
    /// Open the ledger saved under `namespace` (`"bonds"` when empty)
    #[wasm_bindgen(constructor)]
    pub fn new(namespace: &str) -> Self {
        let namespace = if namespace.trim().is_empty() {
            bondledger_core::DEFAULT_NAMESPACE
        } else {
            namespace
        };
        Self::with_store(Schema::default(), LocalStorageStore::new(namespace))
    }

    /// All records as a JSON array
    pub fn records_json(&self) -> String {
        serde_json::to_string(self.ledger.records()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    /// Ordered column definitions as a JSON array
    pub fn columns_json(&self) -> String {
        serde_json::to_string(&column_defs(self.ledger.schema()))
            .unwrap_or_else(|_| "[]".to_string())
    }

    /// Append an empty record named `name` and return its index
    pub fn add_bond(&mut self, name: &str) -> Result<usize, JsValue> {
        let result = self.add_bond_internal(name);
        self.track(result)
    }

    /// Edit a master field or month cell addressed by its header
    pub fn set_field(&mut self, index: usize, header: &str, value: &str) -> Result<(), JsValue> {
        let result = self.set_field_internal(index, header, value);
        self.track(result)
    }

    /// Set a month amount; months after maturity are rejected
    pub fn set_month(&mut self, index: usize, month: &str, amount: f64) -> Result<(), JsValue> {
        let result = self.set_month_internal(index, month, amount);
        self.track(result)
    }

    /// Accumulated amount of one record
    pub fn accumulated(&self, index: usize) -> Option<f64> {
        self.ledger.accumulated(index)
    }

    /// Cell class of one month: `normal`, `maturity` or `post-maturity`
    pub fn classify(&self, index: usize, month: &str) -> Option<String> {
        let month: Month = month.parse().ok()?;
        self.ledger
            .classify(index, month)
            .map(|class| class.as_str().to_string())
    }

    /// CSS class of one month cell (empty for normal cells)
    pub fn cell_class(&self, index: usize, month: &str) -> String {
        let month = month.parse::<Month>().ok();
        month
            .and_then(|m| self.ledger.classify(index, m))
            .map(|class| class.css_class().to_string())
            .unwrap_or_default()
    }

    /// Whether the cell under `header` may be edited for this record
    pub fn is_editable(&self, index: usize, header: &str) -> bool {
        let Some(bond) = self.ledger.get(index) else {
            return false;
        };
        column_defs(self.ledger.schema())
            .iter()
            .find(|column| column.field == header)
            .is_some_and(|column| column.editable_for(bond))
    }

    /// Footer totals as JSON: `{invested, accumulated, months: {label: amount}}`
    pub fn totals_json(&self) -> String {
        totals_value(&self.ledger, &LedgerFilter::default()).to_string()
    }

    /// Filtered and maturity-sorted rows as JSON, with the filter's totals
    ///
    /// `filter` is `{bond, platform, isin}`; missing keys match everything.
    pub fn view_json(&self, filter: JsValue) -> String {
        let filter: LedgerFilter = serde_wasm_bindgen::from_value(filter).unwrap_or_default();
        self.view_json_internal(&filter)
    }

    /// The ledger as XLSX bytes
    pub fn export_xlsx(&mut self) -> Result<Vec<u8>, JsValue> {
        let result = self
            .exporter
            .export(self.ledger.schema(), self.ledger.records())
            .map_err(|e| e.to_string());
        self.track(result)
    }

    /// An empty workbook with the full header row
    pub fn template_xlsx(&mut self) -> Result<Vec<u8>, JsValue> {
        let result = self
            .exporter
            .template(self.ledger.schema())
            .map_err(|e| e.to_string());
        self.track(result)
    }

    /// Replace the ledger with a workbook's first sheet
    ///
    /// Empty input changes nothing. Returns the record count afterwards.
    pub fn import_xlsx(&mut self, bytes: &[u8]) -> Result<usize, JsValue> {
        let result = self.import_xlsx_internal(bytes);
        self.track(result)
    }

    /// Replace the ledger with a sheet decoded by a JavaScript workbook
    /// library: `{headers: [...], rows: [[cell, ...], ...]}`
    pub fn import_cells_json(&mut self, json: &str) -> Result<usize, JsValue> {
        let result = self.import_cells_json_internal(json);
        self.track(result)
    }

    /// Remove every record and the saved ledger
    pub fn clear(&mut self) -> Result<(), JsValue> {
        let result = self.ledger.clear().map_err(|e| e.to_string());
        self.track(result)
    }

    /// Get the last error message
    pub fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

impl BondLedger {
    /// Open a ledger over any store
    ///
    /// A store that cannot be read leaves the ledger empty; the failure is
    /// kept as the last error and later commits still go to the store.
    pub fn with_store<S>(schema: Schema, store: S) -> Self
    where
        S: LedgerStore + Clone + 'static,
    {
        let (ledger, last_error) = match Ledger::open(schema.clone(), store.clone()) {
            Ok(ledger) => (ledger, None),
            Err(err) => {
                warn!(namespace = store.namespace(), error = %err, "starting with an empty ledger");
                let mut ledger = Ledger::new(schema);
                ledger.observe(Persist::new(store));
                (ledger, Some(err.to_string()))
            }
        };

        Self {
            ledger,
            exporter: ExcelExporter::new(),
            last_error,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn add_bond_internal(&mut self, name: &str) -> Result<usize, String> {
        let bond = self
            .ledger
            .schema()
            .empty_record()
            .with(MasterField::Bond, name);
        self.ledger.add(bond).map_err(|e| e.to_string())
    }

    pub fn set_field_internal(
        &mut self,
        index: usize,
        header: &str,
        value: &str,
    ) -> Result<(), String> {
        self.ledger
            .set_cell(index, header, value)
            .map_err(|e| e.to_string())
    }

    pub fn set_month_internal(
        &mut self,
        index: usize,
        month: &str,
        amount: f64,
    ) -> Result<(), String> {
        let month: Month = month
            .parse()
            .map_err(|_| format!("Not a month label: {month}"))?;
        self.ledger
            .set_month(index, month, amount)
            .map_err(|e| e.to_string())
    }

    pub fn view_json_internal(&self, filter: &LedgerFilter) -> String {
        let rows = self.ledger.view(filter);
        json!({
            "rows": rows,
            "totals": totals_value(&self.ledger, filter),
        })
        .to_string()
    }

    pub fn import_xlsx_internal(&mut self, bytes: &[u8]) -> Result<usize, String> {
        if bytes.is_empty() {
            return Ok(self.ledger.len());
        }
        let bonds = import_workbook(self.ledger.schema(), bytes).map_err(|e| e.to_string())?;
        self.ledger.replace_all(bonds).map_err(|e| e.to_string())?;
        Ok(self.ledger.len())
    }

    pub fn import_cells_json_internal(&mut self, json: &str) -> Result<usize, String> {
        let sheet = DecodedSheet::from_json(json).map_err(|e| e.to_string())?;
        let bonds = records_from_sheet(self.ledger.schema(), &sheet);
        self.ledger.replace_all(bonds).map_err(|e| e.to_string())?;
        Ok(self.ledger.len())
    }

    /// Record the outcome for `last_error` and convert for JavaScript
    fn track<T>(&mut self, result: Result<T, String>) -> Result<T, JsValue> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(JsValue::from_str(&e))
            }
        }
    }
}

fn totals_value(ledger: &Ledger, filter: &LedgerFilter) -> Value {
    let totals = ledger.filtered_totals(filter);
    let months: Map<String, Value> = totals
        .months
        .iter()
        .map(|(month, amount)| (month.label(), json!(amount)))
        .collect();
    json!({
        "invested": totals.invested,
        "accumulated": totals.accumulated,
        "months": months,
    })
}

// ============================================================================
// Tests
// ============================================================================
