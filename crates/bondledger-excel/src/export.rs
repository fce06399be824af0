//! Ledger export to XLSX
//!
//! One worksheet laid out as:
//!
//! ```text
//! | Bond | Expected_Interest_Month_Date | ... | Comment | Jan-2022 | ... | Dec-2029 | Accumulated_Amount |
//! |------|------------------------------|-----|---------|----------|-----|----------|--------------------|
//! | Acme | 1                            | ... |         | 850      | ... | 0        | 10200              |
//! | TOTAL|                              | ... |         | =SUM(Q2:Q2) ...            | =SUM(DI2:DI2)      |
//! ```
//!
//! The TOTAL row sums `Invested_Amount`, every month and `Accumulated_Amount`
//! with live `SUM` formulas, each carrying its computed result so readers that
//! do not recalculate still see the value.

use bondledger_core::{
    accumulated_amount, classify, ledger_totals, Bond, CellClass, ExportConfig, FieldValue,
    MasterField, Schema, TOTAL_LABEL,
};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Formula, Workbook, Worksheet};
use tracing::debug;

use crate::CodecError;

/// Smallest column width, in characters
const MIN_COLUMN_WIDTH: f64 = 12.0;

/// XLSX exporter
#[derive(Clone, Debug)]
pub struct ExcelExporter {
    /// Worksheet name
    pub sheet_name: String,
    /// Whether the TOTAL row uses formulas (vs static values)
    pub use_formulas: bool,
    /// Freeze the header row and master columns
    pub freeze_panes: bool,
    /// Shade maturity and post-maturity month cells
    pub highlight_maturity: bool,
}

impl Default for ExcelExporter {
    fn default() -> Self {
        Self {
            sheet_name: "BondTracker".into(),
            use_formulas: true,
            freeze_panes: true,
            highlight_maturity: true,
        }
    }
}

struct ExcelFormats {
    header: Format,
    text: Format,
    number: Format,
    maturity: Format,
    post_maturity: Format,
    total_row: Format,
    total_number: Format,
}

impl ExcelExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            sheet_name: config.sheet_name.clone(),
            use_formulas: config.use_formulas,
            freeze_panes: config.freeze_panes,
            ..Self::default()
        }
    }

    /// Set worksheet name
    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Use static values instead of formulas in the TOTAL row
    pub fn static_values(mut self) -> Self {
        self.use_formulas = false;
        self
    }

    pub fn no_freeze(mut self) -> Self {
        self.freeze_panes = false;
        self
    }

    /// Plain month cells regardless of maturity
    pub fn no_highlight(mut self) -> Self {
        self.highlight_maturity = false;
        self
    }

    /// Generate workbook bytes for a record set
    pub fn export(&self, schema: &Schema, bonds: &[Bond]) -> Result<Vec<u8>, CodecError> {
        let mut workbook = Workbook::new();
        let formats = create_formats();

        let sheet = workbook.add_worksheet();
        sheet
            .set_name(&self.sheet_name)
            .map_err(|e| CodecError::Write(e.to_string()))?;

        self.write_sheet(sheet, schema, bonds, &formats)?;

        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| CodecError::Write(format!("Failed to create Excel: {e}")))?;
        debug!(records = bonds.len(), bytes = buffer.len(), "exported ledger");
        Ok(buffer)
    }

    /// Workbook with the header row and an empty TOTAL row only
    pub fn template(&self, schema: &Schema) -> Result<Vec<u8>, CodecError> {
        self.export(schema, &[])
    }

    fn write_sheet(
        &self,
        sheet: &mut Worksheet,
        schema: &Schema,
        bonds: &[Bond],
        formats: &ExcelFormats,
    ) -> Result<(), CodecError> {
        let headers = schema.headers();
        let master_count = schema.master_fields().len() as u16;
        let month_start = master_count;
        let accumulated_col = month_start + schema.months().len() as u16;

        for (col, header) in headers.iter().enumerate() {
            sheet
                .write_with_format(0, col as u16, header.as_str(), &formats.header)
                .map_err(|e| CodecError::Write(e.to_string()))?;
            let width = MIN_COLUMN_WIDTH.max(header.chars().count() as f64);
            sheet.set_column_width(col as u16, width).ok();
        }

        if self.freeze_panes {
            sheet.set_freeze_panes(1, master_count).ok();
        }

        // Data rows
        let mut row = 1u32;
        for bond in bonds {
            for (col, field) in schema.master_fields().iter().enumerate() {
                let written = match bond.get(*field) {
                    FieldValue::Number(n) => sheet.write_with_format(row, col as u16, n, &formats.number),
                    FieldValue::Text(s) => {
                        sheet.write_with_format(row, col as u16, s.as_str(), &formats.text)
                    }
                };
                written.map_err(|e| CodecError::Write(e.to_string()))?;
            }

            for (i, month) in schema.months().iter().enumerate() {
                let format = if self.highlight_maturity {
                    match classify(bond, *month) {
                        CellClass::Normal => &formats.number,
                        CellClass::Maturity => &formats.maturity,
                        CellClass::PostMaturity => &formats.post_maturity,
                    }
                } else {
                    &formats.number
                };
                sheet
                    .write_with_format(row, month_start + i as u16, bond.amount(*month), format)
                    .map_err(|e| CodecError::Write(e.to_string()))?;
            }

            sheet
                .write_with_format(row, accumulated_col, accumulated_amount(schema, bond), &formats.number)
                .map_err(|e| CodecError::Write(e.to_string()))?;

            row += 1;
        }

        // TOTAL row
        let totals = ledger_totals(schema, bonds);
        let mut summed: Vec<(u16, f64)> = vec![(
            column_of(MasterField::InvestedAmount, schema),
            totals.invested,
        )];
        summed.extend(
            totals
                .months
                .iter()
                .enumerate()
                .map(|(i, (_, total))| (month_start + i as u16, *total)),
        );
        summed.push((accumulated_col, totals.accumulated));

        for col in 0..master_count {
            let label = if col == column_of(MasterField::Bond, schema) {
                TOTAL_LABEL
            } else {
                ""
            };
            sheet
                .write_with_format(row, col, label, &formats.total_row)
                .map_err(|e| CodecError::Write(e.to_string()))?;
        }

        for (col, total) in summed {
            if self.use_formulas && row > 1 {
                let letter = col_to_letter(col);
                let formula = Formula::new(format!("=SUM({letter}2:{letter}{row})"))
                    .set_result(total.to_string());
                sheet
                    .write_formula_with_format(row, col, formula, &formats.total_number)
                    .map_err(|e| CodecError::Write(e.to_string()))?;
            } else {
                sheet
                    .write_with_format(row, col, total, &formats.total_number)
                    .map_err(|e| CodecError::Write(e.to_string()))?;
            }
        }

        Ok(())
    }
}

fn create_formats() -> ExcelFormats {
    let header = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_background_color(0x4472C4)
        .set_font_color(0xFFFFFF)
        .set_border(FormatBorder::Thin);

    let text = Format::new().set_border(FormatBorder::Thin);

    let number = Format::new()
        .set_num_format("#,##0.00")
        .set_border(FormatBorder::Thin);

    let maturity = Format::new()
        .set_num_format("#,##0.00")
        .set_bold()
        .set_background_color(0xFFF2CC) // Light gold
        .set_border(FormatBorder::Thin);

    let post_maturity = Format::new()
        .set_num_format("#,##0.00")
        .set_font_color(0x808080)
        .set_background_color(0xF2F2F2) // Light grey
        .set_border(FormatBorder::Thin);

    let total_row = Format::new()
        .set_bold()
        .set_background_color(0xE2EFDA)
        .set_border(FormatBorder::Thin);

    let total_number = Format::new()
        .set_bold()
        .set_num_format("#,##0.00")
        .set_background_color(0xE2EFDA)
        .set_border(FormatBorder::Thin);

    ExcelFormats {
        header,
        text,
        number,
        maturity,
        post_maturity,
        total_row,
        total_number,
    }
}

fn column_of(field: MasterField, schema: &Schema) -> u16 {
    schema
        .master_fields()
        .iter()
        .position(|f| *f == field)
        .unwrap_or(0) as u16
}

/// Convert 0-based column index to Excel letters (0 = A, 26 = AA)
pub fn col_to_letter(col: u16) -> String {
    let mut result = String::new();
    let mut n = col as u32;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}
