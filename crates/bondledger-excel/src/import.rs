//! Ledger import from spreadsheets
//!
//! Import is a full replacement: the first worksheet's header row names the
//! columns, every following row becomes one record. Rows are seeded from the
//! schema's empty record so absent columns keep their defaults, and headers
//! the schema does not know are ignored.

use std::io::Cursor;

use bondledger_core::{is_total_label, Bond, HeaderTarget, MasterField, Schema};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use serde::Deserialize;
use tracing::{debug, info};

use crate::cell::{CellContent, CellScalar};
use crate::CodecError;

/// A worksheet decoded into a header row and data rows
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecodedSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellContent>>,
}

impl DecodedSheet {
    /// Parse the JSON a browser-side workbook library produces
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        serde_json::from_str(json).map_err(|e| CodecError::InvalidCells(e.to_string()))
    }
}

/// Read and reconcile the first worksheet of an `.xlsx` / `.xls` workbook
pub fn import_workbook(schema: &Schema, bytes: &[u8]) -> Result<Vec<Bond>, CodecError> {
    let sheet = read_first_sheet(bytes)?;
    Ok(records_from_sheet(schema, &sheet))
}

/// Decode the first worksheet, pairing each value with its formula if any
pub fn read_first_sheet(bytes: &[u8]) -> Result<DecodedSheet, CodecError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| CodecError::Read(e.to_string()))?;

    let Some(name) = workbook.sheet_names().first().cloned() else {
        return Err(CodecError::NoWorksheet);
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| CodecError::Read(format!("worksheet {name}: {e}")))?;
    // Formula ranges may be absent for some formats
    let formulas = workbook.worksheet_formula(&name).ok();

    Ok(decode_range(&range, formulas.as_ref()))
}

fn decode_range(range: &Range<Data>, formulas: Option<&Range<String>>) -> DecodedSheet {
    let Some((row_offset, col_offset)) = range.start() else {
        return DecodedSheet::default();
    };

    let cell_at = |row: usize, col: usize, data: &Data| {
        let position = (row_offset + row as u32, col_offset + col as u32);
        let value = scalar_from_data(data);
        match formulas.and_then(|f| f.get_value(position)) {
            Some(expression) if !expression.trim().is_empty() => CellContent::Formula {
                expression: expression.clone(),
                cached: Some(value).filter(|v| *v != CellScalar::Empty),
            },
            _ => CellContent::Scalar(value),
        }
    };

    let mut rows = range.rows().enumerate();
    let headers = match rows.next() {
        Some((_, header_row)) => header_row
            .iter()
            .enumerate()
            .map(|(col, data)| cell_at(0, col, data).resolve().to_text())
            .collect(),
        None => return DecodedSheet::default(),
    };

    let rows = rows
        .map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(|(col, data)| cell_at(row, col, data))
                .collect()
        })
        .collect();

    DecodedSheet { headers, rows }
}

fn scalar_from_data(data: &Data) -> CellScalar {
    match data {
        Data::Empty => CellScalar::Empty,
        Data::String(s) => CellScalar::Text(s.clone()),
        Data::Float(f) => CellScalar::Number(*f),
        Data::Int(i) => CellScalar::Number(*i as f64),
        Data::Bool(b) => CellScalar::Bool(*b),
        // Date cells become ISO dates, time of day dropped
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|dt| CellScalar::Text(dt.date().format("%Y-%m-%d").to_string()))
            .unwrap_or_else(|| CellScalar::Number(dt.as_f64())),
        Data::DateTimeIso(s) => CellScalar::Text(s.get(..10).unwrap_or(s).to_string()),
        Data::DurationIso(s) => CellScalar::Text(s.clone()),
        Data::Error(_) => CellScalar::Empty,
    }
}

/// Turn decoded rows into records reconciled against `schema`
///
/// Blank rows and rows whose `Bond` cell is the TOTAL marker are skipped.
pub fn records_from_sheet(schema: &Schema, sheet: &DecodedSheet) -> Vec<Bond> {
    let targets: Vec<HeaderTarget> = sheet
        .headers
        .iter()
        .map(|h| schema.resolve_header(h))
        .collect();
    let bond_col = targets
        .iter()
        .position(|t| *t == HeaderTarget::Master(MasterField::Bond));

    let mut bonds = Vec::new();
    let mut skipped_totals = 0usize;

    for cells in &sheet.rows {
        let values: Vec<CellScalar> = cells.iter().map(CellContent::resolve).collect();
        if values.iter().all(CellScalar::is_blank) {
            continue;
        }
        let is_total = bond_col
            .and_then(|col| values.get(col))
            .is_some_and(|v| is_total_label(&v.to_text()));
        if is_total {
            skipped_totals += 1;
            continue;
        }

        let mut bond = schema.empty_record();
        for (target, value) in targets.iter().zip(values) {
            match target {
                HeaderTarget::Master(field) if field.is_numeric() => {
                    bond.set(*field, value.as_amount());
                }
                HeaderTarget::Master(field) => bond.set(*field, value.to_text()),
                HeaderTarget::Month(month) => bond.set_amount(*month, value.as_amount()),
                HeaderTarget::Accumulated | HeaderTarget::Unknown => {}
            }
        }
        bonds.push(bond);
    }

    let ignored: Vec<&str> = sheet
        .headers
        .iter()
        .zip(&targets)
        .filter(|(_, t)| **t == HeaderTarget::Unknown)
        .map(|(h, _)| h.as_str())
        .collect();
    if !ignored.is_empty() {
        debug!(columns = ?ignored, "ignored unknown columns");
    }
    info!(records = bonds.len(), skipped_totals, "imported ledger");
    bonds
}

#[cfg(test)]
mod tests {
    use super::*;
    use bondledger_core::{Month, TrackingWindow};
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::new(TrackingWindow::new(2023, 1, 3)).unwrap()
    }

    fn text(s: &str) -> CellContent {
        CellContent::Scalar(CellScalar::from(s))
    }

    fn num(n: f64) -> CellContent {
        CellContent::Scalar(CellScalar::Number(n))
    }

    fn month(label: &str) -> Month {
        label.parse().unwrap()
    }

    #[test]
    fn rows_overlay_the_empty_record() {
        let sheet = DecodedSheet {
            headers: vec!["Bond".into(), "Invested_Amount".into(), "Feb-2023".into(), "Notes".into()],
            rows: vec![vec![text("Acme"), text("1500"), num(42.0), text("ignored")]],
        };
        let bonds = records_from_sheet(&schema(), &sheet);
        assert_eq!(bonds.len(), 1);
        let bond = &bonds[0];
        assert_eq!(bond.name, "Acme");
        assert_eq!(bond.invested_amount, 1500.0);
        assert_eq!(bond.amount(month("Feb-2023")), 42.0);
        assert_eq!(bond.amount(month("Jan-2023")), 0.0);
        assert_eq!(bond.months.len(), 3);
        assert_eq!(bond.interest_frequency, "Monthly");
    }

    #[test]
    fn total_and_blank_rows_are_skipped() {
        let sheet = DecodedSheet {
            headers: vec!["Platform".into(), "Bond".into()],
            rows: vec![
                vec![text("Wint"), text("A")],
                vec![CellContent::default(), text("  ")],
                vec![text(""), text(" Total ")],
                vec![text("x"), CellContent::RichText(vec!["TO".into(), "TAL".into()])],
                vec![text("GoldenPi"), text("B")],
            ],
        };
        let names: Vec<String> = records_from_sheet(&schema(), &sheet)
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn formulas_contribute_cached_values_only() {
        let sheet = DecodedSheet {
            headers: vec!["Bond".into(), "Jan-2023".into(), "Comment".into()],
            rows: vec![vec![
                text("Acme"),
                CellContent::Formula {
                    expression: "=B1*2".into(),
                    cached: Some(CellScalar::Number(20.0)),
                },
                CellContent::Formula {
                    expression: "=CONCAT(\"a\",\"b\")".into(),
                    cached: None,
                },
            ]],
        };
        let bond = &records_from_sheet(&schema(), &sheet)[0];
        assert_eq!(bond.amount(month("Jan-2023")), 20.0);
        assert_eq!(bond.comment, "");
    }

    #[test]
    fn short_rows_keep_defaults() {
        let sheet = DecodedSheet {
            headers: vec!["Bond".into(), "Status".into(), "Mar-2023".into()],
            rows: vec![vec![text("Short row")]],
        };
        let bond = &records_from_sheet(&schema(), &sheet)[0];
        assert_eq!(bond.status, "Active");
        assert_eq!(bond.amount(month("Mar-2023")), 0.0);
    }

    #[test]
    fn sheet_without_rows_is_empty() {
        assert!(records_from_sheet(&schema(), &DecodedSheet::default()).is_empty());
    }

    #[test]
    fn decoded_sheet_from_json() {
        let sheet = DecodedSheet::from_json(
            r#"{
                "headers": ["Bond", "Jan-2023", "Accumulated_Amount"],
                "rows": [
                    [{"richText": [{"text": "Acme"}]}, {"formula": "1+1", "result": 2}, 99],
                    ["TOTAL", {"formula": "SUM(B2:B2)", "result": 2}, {"formula": "SUM(C2:C2)"}]
                ]
            }"#,
        )
        .unwrap();
        let bonds = records_from_sheet(&schema(), &sheet);
        assert_eq!(bonds.len(), 1);
        assert_eq!(bonds[0].name, "Acme");
        assert_eq!(bonds[0].amount(month("Jan-2023")), 2.0);

        assert!(matches!(
            DecodedSheet::from_json("[1, 2]"),
            Err(CodecError::InvalidCells(_))
        ));
    }

    #[test]
    fn garbage_bytes_are_a_read_error() {
        let err = import_workbook(&schema(), b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, CodecError::Read(_)));
    }

    #[test]
    fn calamine_scalars() {
        assert_eq!(scalar_from_data(&Data::Int(7)), CellScalar::Number(7.0));
        assert_eq!(
            scalar_from_data(&Data::DateTimeIso("2023-03-15T00:00:00".into())),
            CellScalar::Text("2023-03-15".into())
        );
        assert_eq!(scalar_from_data(&Data::Empty), CellScalar::Empty);
    }
}
