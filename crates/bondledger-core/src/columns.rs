//! Column definitions for table renderers

use serde::Serialize;

use crate::derivation::is_month_editable;
use crate::month::Month;
use crate::record::Bond;
use crate::schema::{FieldKind, MasterField, Schema, ACCUMULATED_HEADER};

/// Width of every month column
pub const MONTH_COLUMN_WIDTH: u32 = 110;

/// Side a column is pinned to while the grid scrolls
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pin {
    Left,
    Right,
}

/// When a column's cells accept edits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Editable {
    Always,
    /// Month cells up to and including the maturity month
    UntilMaturity,
    /// Derived values
    Never,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnKind {
    Text,
    Number,
    Date,
    Choice,
    Month,
    Accumulated,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Record key (the spreadsheet header)
    pub field: String,
    /// Display title
    pub label: String,
    pub kind: ColumnKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<Pin>,
    pub min_width: u32,
    /// Allowed values for choice columns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<&'static [&'static str]>,
    pub editable: Editable,
}

impl ColumnDef {
    /// Evaluate the editable predicate for one record
    pub fn editable_for(&self, bond: &Bond) -> bool {
        match self.editable {
            Editable::Always => true,
            Editable::Never => false,
            Editable::UntilMaturity => self
                .field
                .parse::<Month>()
                .map_or(true, |month| is_month_editable(bond, month)),
        }
    }
}

fn master_width(field: MasterField) -> u32 {
    match field {
        MasterField::Bond | MasterField::InterestFrequency => 160,
        MasterField::ExpectedInterestDay => 150,
        MasterField::InterestRate
        | MasterField::InvestedAmount
        | MasterField::BankAccount
        | MasterField::PurchaseType
        | MasterField::SettlementDate
        | MasterField::Isin => 140,
        MasterField::BondAmount | MasterField::MaturityDate => 130,
        MasterField::Platform | MasterField::Account | MasterField::Status => 120,
        MasterField::Closed => 110,
        MasterField::Comment => 200,
    }
}

fn master_column(field: MasterField) -> ColumnDef {
    let (kind, values) = match field.kind() {
        FieldKind::Text => (ColumnKind::Text, None),
        FieldKind::Number => (ColumnKind::Number, None),
        FieldKind::Date => (ColumnKind::Date, None),
        FieldKind::Choice(values) => (ColumnKind::Choice, Some(values)),
    };
    let pinned = matches!(
        field,
        MasterField::Bond
            | MasterField::ExpectedInterestDay
            | MasterField::InterestRate
            | MasterField::InterestFrequency
    )
    .then_some(Pin::Left);

    ColumnDef {
        field: field.header().to_string(),
        label: field.label().to_string(),
        kind,
        pinned,
        min_width: master_width(field),
        values,
        editable: Editable::Always,
    }
}

/// Ordered columns: master fields, one per tracked month, then accumulated
pub fn column_defs(schema: &Schema) -> Vec<ColumnDef> {
    let mut columns: Vec<ColumnDef> = schema
        .master_fields()
        .iter()
        .copied()
        .map(master_column)
        .collect();

    columns.extend(schema.months().iter().map(|month| ColumnDef {
        field: month.label(),
        label: month.label(),
        kind: ColumnKind::Month,
        pinned: None,
        min_width: MONTH_COLUMN_WIDTH,
        values: None,
        editable: Editable::UntilMaturity,
    }));

    columns.push(ColumnDef {
        field: ACCUMULATED_HEADER.to_string(),
        label: "Accumulated Amount".to_string(),
        kind: ColumnKind::Accumulated,
        pinned: Some(Pin::Right),
        min_width: 160,
        values: None,
        editable: Editable::Never,
    });

    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TrackingWindow;
    use pretty_assertions::assert_eq;

    #[test]
    fn layout_matches_headers() {
        let schema = Schema::default();
        let columns = column_defs(&schema);
        let fields: Vec<String> = columns.iter().map(|c| c.field.clone()).collect();
        assert_eq!(fields, schema.headers());
        assert_eq!(columns.last().unwrap().pinned, Some(Pin::Right));
    }

    #[test]
    fn first_four_masters_are_pinned() {
        let columns = column_defs(&Schema::default());
        let pinned: Vec<&str> = columns
            .iter()
            .filter(|c| c.pinned == Some(Pin::Left))
            .map(|c| c.field.as_str())
            .collect();
        assert_eq!(
            pinned,
            vec!["Bond", "Expected_Interest_Month_Date", "Interest_Rate", "Interest_Frequency"]
        );
    }

    #[test]
    fn choice_columns_carry_values() {
        let columns = column_defs(&Schema::default());
        let by_field = |f: &str| columns.iter().find(|c| c.field == f).unwrap().clone();

        assert_eq!(by_field("Expected_Interest_Month_Date").values.unwrap().len(), 31);
        assert_eq!(
            by_field("Interest_Frequency").values.unwrap(),
            &["Monthly", "Quarterly", "Half-Yearly", "Yearly"]
        );
        assert_eq!(by_field("Closed?").values.unwrap(), &["Yes", "No"]);
        assert_eq!(by_field("Comment").values, None);
        assert_eq!(by_field("Comment").min_width, 200);
    }

    #[test]
    fn month_editability_tracks_maturity() {
        let schema = Schema::new(TrackingWindow::new(2023, 1, 6)).unwrap();
        let columns = column_defs(&schema);
        let bond = schema
            .empty_record()
            .with(MasterField::MaturityDate, "2023-03-15");

        let col = |f: &str| columns.iter().find(|c| c.field == f).unwrap();
        assert!(col("Mar-2023").editable_for(&bond));
        assert!(!col("Apr-2023").editable_for(&bond));
        assert!(!col(ACCUMULATED_HEADER).editable_for(&bond));
        assert!(col("Bond").editable_for(&bond));
    }

    #[test]
    fn serializes_for_renderers() {
        let schema = Schema::new(TrackingWindow::new(2023, 1, 1)).unwrap();
        let json = serde_json::to_value(column_defs(&schema)).unwrap();
        assert_eq!(json[0]["pinned"], "left");
        assert_eq!(json[0]["minWidth"], 160);
        assert_eq!(json[16]["editable"], "until-maturity");
        assert_eq!(json[17]["editable"], "never");
        assert!(json[5].get("values").is_none());
    }
}
