//! Subcommand implementations
//!
//! Each command works on an opened [`Ledger`] and writes its report to `out`.
//! Every ledger mutation is persisted by the ledger's store observer.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use bondledger_core::{apply_cell, classify, CellClass, Ledger, LedgerFilter, MasterField};
use bondledger_excel::{import_workbook, ExcelExporter};
use clap::ValueEnum;
use serde_json::json;
use tracing::info;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parse a `HEADER=VALUE` pair
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((header, value)) if !header.trim().is_empty() => {
            Ok((header.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected HEADER=VALUE, got {s:?}")),
    }
}

/// Append a record built from defaults, the name and `fields`
pub fn add(
    ledger: &mut Ledger,
    name: &str,
    fields: &[(String, String)],
    out: &mut dyn Write,
) -> Result<()> {
    let schema = ledger.schema().clone();
    let mut bond = schema.empty_record().with(MasterField::Bond, name);
    for (header, value) in fields {
        apply_cell(&schema, &mut bond, header, value)
            .with_context(|| format!("setting {header}"))?;
    }
    let index = ledger.add(bond)?;
    writeln!(out, "Added bond #{index}: {name}")?;
    Ok(())
}

pub fn set(
    ledger: &mut Ledger,
    index: usize,
    header: &str,
    value: &str,
    out: &mut dyn Write,
) -> Result<()> {
    ledger.set_cell(index, header, value)?;
    writeln!(out, "Updated bond #{index}: {header} = {value}")?;
    Ok(())
}

pub fn list(
    ledger: &Ledger,
    filter: &LedgerFilter,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let rows = ledger.view(filter);

    if format == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }

    if rows.is_empty() {
        writeln!(out, "No bonds")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:>3}  {:<28} {:<14} {:<14} {:<12} {:>12} {:>12}",
        "#", "Bond", "Platform", "ISIN", "Maturity", "Invested", "Accumulated"
    )?;
    for row in &rows {
        let bond = row.bond;
        writeln!(
            out,
            "{:>3}  {:<28} {:<14} {:<14} {:<12} {:>12.2} {:>12.2}",
            row.index,
            truncate(&bond.name, 28),
            truncate(&bond.platform, 14),
            truncate(&bond.isin, 14),
            truncate(&bond.maturity_date, 12),
            bond.invested_amount,
            row.accumulated
        )?;
    }

    let totals = ledger.filtered_totals(filter);
    writeln!(
        out,
        "{:>3}  {:<28} {:<14} {:<14} {:<12} {:>12.2} {:>12.2}",
        "", "TOTAL", "", "", "", totals.invested, totals.accumulated
    )?;
    Ok(())
}

/// One record's master fields and month grid with maturity classes
pub fn show(ledger: &Ledger, index: usize, out: &mut dyn Write) -> Result<()> {
    let Some(bond) = ledger.get(index) else {
        bail!("no bond at index {index}");
    };

    for field in ledger.schema().master_fields() {
        writeln!(out, "{:<24} {}", field.label(), bond.get(*field).into_text())?;
    }
    writeln!(out)?;

    for month in ledger.schema().months() {
        let class = classify(bond, *month);
        let marker = match class {
            CellClass::Normal => String::new(),
            other => format!("  [{other}]"),
        };
        writeln!(out, "{:<10} {:>12.2}{}", month.label(), bond.amount(*month), marker)?;
    }

    let accumulated = ledger.accumulated(index).unwrap_or_default();
    writeln!(out, "{:<10} {:>12.2}", "Accumulated", accumulated)?;
    Ok(())
}

pub fn totals(ledger: &Ledger, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    let totals = ledger.totals();
    let months: Vec<_> = totals
        .months
        .iter()
        .filter(|(_, amount)| *amount != 0.0)
        .collect();

    match format {
        OutputFormat::Json => {
            let value = json!({
                "invested": totals.invested,
                "accumulated": totals.accumulated,
                "months": months
                    .iter()
                    .map(|(month, amount)| json!({ "month": month.label(), "amount": amount }))
                    .collect::<Vec<_>>(),
            });
            serde_json::to_writer_pretty(&mut *out, &value)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(out, "{:<12} {:>12.2}", "Invested", totals.invested)?;
            writeln!(out, "{:<12} {:>12.2}", "Accumulated", totals.accumulated)?;
            for (month, amount) in months {
                writeln!(out, "{:<12} {:>12.2}", month.label(), amount)?;
            }
        }
    }
    Ok(())
}

pub fn export(
    ledger: &Ledger,
    exporter: &ExcelExporter,
    path: &Path,
    out: &mut dyn Write,
) -> Result<()> {
    let bytes = exporter.export(ledger.schema(), ledger.records())?;
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    writeln!(out, "Exported {} bonds to {}", ledger.len(), path.display())?;
    Ok(())
}

/// Write an empty workbook with the full header row
pub fn template(
    ledger: &Ledger,
    exporter: &ExcelExporter,
    path: &Path,
    out: &mut dyn Write,
) -> Result<()> {
    let bytes = exporter.template(ledger.schema())?;
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    writeln!(out, "Wrote template to {}", path.display())?;
    Ok(())
}

/// Replace the ledger with a workbook's records
///
/// An empty file changes nothing; a workbook that cannot be read leaves the
/// ledger as it was.
pub fn import(ledger: &mut Ledger, path: &Path, out: &mut dyn Write) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.is_empty() {
        writeln!(out, "Nothing to import: {} is empty", path.display())?;
        return Ok(());
    }

    let bonds = import_workbook(ledger.schema(), &bytes)
        .with_context(|| format!("importing {}", path.display()))?;
    ledger.replace_all(bonds)?;
    info!(path = %path.display(), records = ledger.len(), "ledger replaced");
    writeln!(out, "Imported {} bonds from {}", ledger.len(), path.display())?;
    Ok(())
}

pub fn clear(ledger: &mut Ledger, out: &mut dyn Write) -> Result<()> {
    ledger.clear()?;
    writeln!(out, "Cleared ledger")?;
    Ok(())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}
