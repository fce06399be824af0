//! End-to-end tests driving the `bondledger` binary
//!
//! Each test runs in its own temporary directory with the ledger stored under
//! `<tmp>/data`.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn bondledger(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bondledger"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("BONDLEDGER_DATA_DIR")
        .arg("--data-dir")
        .arg(dir.join("data"))
        .args(args)
        .output()
        .expect("failed to execute bondledger")
}

fn run_ok(dir: &Path, args: &[&str]) -> String {
    let output = bondledger(dir, args);
    assert!(
        output.status.success(),
        "bondledger {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

fn list_json(dir: &Path) -> serde_json::Value {
    serde_json::from_str(&run_ok(dir, &["list", "--format", "json"])).unwrap()
}

/// Small window so month headers stay predictable
fn with_config(dir: &Path) {
    fs::write(
        dir.join("bondledger.toml"),
        "[window]\nstart_year = 2023\nstart_month = 1\nmonths = 12\n",
    )
    .unwrap();
}

fn seeded() -> TempDir {
    let tmp = TempDir::new().unwrap();
    with_config(tmp.path());
    run_ok(
        tmp.path(),
        &[
            "add",
            "--bond",
            "Acme 10% 2023",
            "--field",
            "MaturityDate=2023-04-30",
            "--field",
            "Platform=Wint Wealth",
            "--field",
            "Invested_Amount=9850",
            "--field",
            "Mar-2023=87.5",
        ],
    );
    run_ok(
        tmp.path(),
        &["add", "--bond", "Beta Perpetual", "--field", "Jan-2023=40"],
    );
    tmp
}

#[test]
fn no_command_prints_banner() {
    let tmp = TempDir::new().unwrap();
    let stdout = run_ok(tmp.path(), &[]);
    assert!(stdout.contains("bondledger"));
    assert!(!tmp.path().join("data").exists());
}

#[test]
fn add_persists_between_runs() {
    let tmp = seeded();
    assert!(tmp.path().join("data/bonds.json").exists());

    let rows = list_json(tmp.path());
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);

    // Sorted by maturity: dated bond first, open-ended last
    assert_eq!(rows[0]["bond"]["Bond"], "Acme 10% 2023");
    assert_eq!(rows[0]["bond"]["Platform"], "Wint Wealth");
    assert_eq!(rows[0]["accumulated"], 87.5);
    assert_eq!(rows[1]["bond"]["Bond"], "Beta Perpetual");
    assert_eq!(rows[1]["index"], 1);
}

#[test]
fn list_filters_and_prints_totals() {
    let tmp = seeded();

    let text = run_ok(tmp.path(), &["list"]);
    assert!(text.contains("Acme"));
    assert!(text.contains("Beta"));
    assert!(text.lines().last().unwrap().contains("TOTAL"));

    let filtered = run_ok(tmp.path(), &["list", "--platform", "wint"]);
    assert!(filtered.contains("Acme"));
    assert!(!filtered.contains("Beta"));

    let none = run_ok(tmp.path(), &["list", "--isin", "XS000"]);
    assert_eq!(none, "No bonds\n");
}

#[test]
fn set_updates_cells_and_rejects_locked_months() {
    let tmp = seeded();

    run_ok(tmp.path(), &["set", "0", "Apr-2023", "12.5"]);
    run_ok(tmp.path(), &["set", "0", "Comment", "coupon delayed"]);

    let locked = bondledger(tmp.path(), &["set", "0", "May-2023", "1"]);
    assert!(!locked.status.success());
    assert!(String::from_utf8_lossy(&locked.stderr).contains("May-2023"));

    let unknown = bondledger(tmp.path(), &["set", "0", "Accumulated_Amount", "1"]);
    assert!(!unknown.status.success());

    let missing = bondledger(tmp.path(), &["set", "9", "Platform", "x"]);
    assert!(!missing.status.success());

    let rows = list_json(tmp.path());
    assert_eq!(rows[0]["accumulated"], 100.0);
    assert_eq!(rows[0]["bond"]["Comment"], "coupon delayed");
}

#[test]
fn total_is_rejected_as_a_bond_name() {
    let tmp = seeded();

    let added = bondledger(tmp.path(), &["add", "--bond", "Total"]);
    assert!(!added.status.success());
    assert!(String::from_utf8_lossy(&added.stderr).contains("reserved"));

    let renamed = bondledger(tmp.path(), &["set", "1", "Bond", " TOTAL "]);
    assert!(!renamed.status.success());

    let rows = list_json(tmp.path());
    let names: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["bond"]["Bond"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Acme 10% 2023", "Beta Perpetual"]);
}

#[test]
fn show_marks_maturity_columns() {
    let tmp = seeded();
    let text = run_ok(tmp.path(), &["show", "0"]);
    assert!(text.contains("Wint Wealth"));
    assert!(text
        .lines()
        .any(|l| l.starts_with("Apr-2023") && l.ends_with("[maturity]")));
    assert!(text
        .lines()
        .any(|l| l.starts_with("May-2023") && l.ends_with("[post-maturity]")));
}

#[test]
fn totals_as_json() {
    let tmp = seeded();
    let stdout = run_ok(tmp.path(), &["totals", "--format", "json"]);
    let totals: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(totals["invested"], 9850.0);
    assert_eq!(totals["accumulated"], 127.5);
    let months: Vec<&str> = totals["months"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["month"].as_str().unwrap())
        .collect();
    assert_eq!(months, vec!["Jan-2023", "Mar-2023"]);
}

#[test]
fn export_then_import_restores_the_ledger() {
    let tmp = seeded();
    let before = list_json(tmp.path());

    run_ok(tmp.path(), &["export", "ledger.xlsx"]);
    assert!(tmp.path().join("ledger.xlsx").exists());

    run_ok(tmp.path(), &["clear"]);
    assert!(!tmp.path().join("data/bonds.json").exists());
    assert_eq!(run_ok(tmp.path(), &["list"]), "No bonds\n");

    let stdout = run_ok(tmp.path(), &["import", "ledger.xlsx"]);
    assert!(stdout.contains("Imported 2 bonds"));
    assert_eq!(list_json(tmp.path()), before);
}

#[test]
fn template_imports_as_empty_ledger() {
    let tmp = seeded();
    run_ok(tmp.path(), &["template", "blank.xlsx"]);
    run_ok(tmp.path(), &["import", "blank.xlsx"]);
    assert_eq!(list_json(tmp.path()), serde_json::json!([]));
}

#[test]
fn empty_import_file_changes_nothing() {
    let tmp = seeded();
    fs::write(tmp.path().join("empty.xlsx"), b"").unwrap();

    let stdout = run_ok(tmp.path(), &["import", "empty.xlsx"]);
    assert!(stdout.contains("Nothing to import"));
    assert_eq!(list_json(tmp.path()).as_array().unwrap().len(), 2);
}

#[test]
fn unreadable_workbook_leaves_ledger_unchanged() {
    let tmp = seeded();
    fs::write(tmp.path().join("bad.xlsx"), b"not a spreadsheet").unwrap();

    let output = bondledger(tmp.path(), &["import", "bad.xlsx"]);
    assert!(!output.status.success());
    assert_eq!(list_json(tmp.path()).as_array().unwrap().len(), 2);
}

#[test]
fn config_namespace_selects_the_ledger_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("bondledger.toml"),
        "[storage]\nnamespace = \"family\"\n",
    )
    .unwrap();

    run_ok(tmp.path(), &["add", "--bond", "Gamma"]);
    assert!(tmp.path().join("data/family.json").exists());
    assert!(!tmp.path().join("data/bonds.json").exists());
}

#[test]
fn invalid_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bondledger.toml"), "[window]\nmonths = 0\n").unwrap();

    let output = bondledger(tmp.path(), &["list"]);
    assert!(!output.status.success());
    assert!(!String::from_utf8_lossy(&output.stderr).is_empty());
}
