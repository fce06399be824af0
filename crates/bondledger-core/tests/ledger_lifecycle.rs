//! Ledger lifecycle against a file store: open, edit, reopen, clear

use bondledger_core::{
    JsonFileStore, Ledger, LedgerConfig, LedgerStore, MasterField, Month, Schema, TrackingWindow,
};
use pretty_assertions::assert_eq;

fn month(label: &str) -> Month {
    label.parse().unwrap()
}

fn schema() -> Schema {
    Schema::new(TrackingWindow::new(2022, 1, 24)).unwrap()
}

#[test]
fn edits_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let store = || JsonFileStore::new(dir.path(), "bonds");

    {
        let mut ledger = Ledger::open(schema(), store()).unwrap();
        assert!(ledger.is_empty());
        let i = ledger.add_empty().unwrap();
        ledger.set_field(i, MasterField::Bond, "Acme 10% 2023").unwrap();
        ledger.set_field(i, MasterField::MaturityDate, "2023-03-15").unwrap();
        ledger.set_field(i, MasterField::InvestedAmount, 10_000.0).unwrap();
        ledger.set_month(i, month("Feb-2023"), 85.0).unwrap();
    }

    let ledger = Ledger::open(schema(), store()).unwrap();
    assert_eq!(ledger.len(), 1);
    let bond = ledger.get(0).unwrap();
    assert_eq!(bond.name, "Acme 10% 2023");
    assert_eq!(bond.invested_amount, 10_000.0);
    assert_eq!(bond.amount(month("Feb-2023")), 85.0);
    assert_eq!(bond.months.len(), 24);
    assert_eq!(ledger.accumulated(0), Some(85.0));
}

#[test]
fn clear_empties_ledger_and_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut ledger = Ledger::open(schema(), JsonFileStore::new(dir.path(), "bonds")).unwrap();
    ledger.add_empty().unwrap();
    ledger.add_empty().unwrap();

    let probe = JsonFileStore::new(dir.path(), "bonds");
    assert_eq!(probe.load().unwrap().map(|b| b.len()), Some(2));

    ledger.clear().unwrap();
    assert!(ledger.is_empty());
    assert_eq!(probe.load().unwrap(), None);
    assert!(!probe.path().exists());
}

#[test]
fn reopening_with_a_smaller_window_trims_months() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut ledger = Ledger::open(schema(), JsonFileStore::new(dir.path(), "bonds")).unwrap();
        let i = ledger.add_empty().unwrap();
        ledger.set_month(i, month("Dec-2023"), 5.0).unwrap();
        ledger.set_month(i, month("Jan-2022"), 7.0).unwrap();
    }

    let narrow = Schema::new(TrackingWindow::new(2022, 1, 12)).unwrap();
    let ledger = Ledger::open(narrow, JsonFileStore::new(dir.path(), "bonds")).unwrap();
    let bond = ledger.get(0).unwrap();
    assert_eq!(bond.months.len(), 12);
    assert_eq!(bond.amount(month("Jan-2022")), 7.0);
    assert!(!bond.months.contains_key(&month("Dec-2023")));
}

#[test]
fn config_drives_schema_and_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = LedgerConfig::from_toml_str(
        r#"
        [window]
        start_year = 2024
        start_month = 4
        months = 6

        [storage]
        namespace = "portfolio"
        "#,
    )
    .unwrap();

    let store = JsonFileStore::new(dir.path(), config.storage.namespace.clone());
    let mut ledger = Ledger::open(config.schema().unwrap(), store).unwrap();
    ledger.add_empty().unwrap();

    assert!(dir.path().join("portfolio.json").exists());
    let labels = ledger.schema().month_labels();
    assert_eq!(labels.first().map(String::as_str), Some("Apr-2024"));
    assert_eq!(labels.last().map(String::as_str), Some("Sep-2024"));
}
