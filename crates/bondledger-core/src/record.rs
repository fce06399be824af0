//! Bond records
//!
//! A [`Bond`] is a fixed set of master attributes plus a map from [`Month`] to
//! the cash-flow amount booked in that month. Enumerated attributes are kept
//! as text so that imported values outside the documented option sets survive
//! a round trip; the typed accessors interpret them on demand.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::month::{parse_date_only, Month};
use crate::schema::{is_total_label, MasterField};

// ============================================================================
// Choice Fields
// ============================================================================

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident,
        { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Display values in documented order
            pub const OPTIONS: &'static [&'static str] = &[$($text),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Case-insensitive lookup of a display value
            pub fn parse(s: &str) -> Option<Self> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($text) {
                        return Some(Self::$variant);
                    }
                )+
                None
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice_enum! {
    /// How often the bond pays interest
    InterestFrequency, default = Monthly,
    {
        Monthly => "Monthly",
        Quarterly => "Quarterly",
        HalfYearly => "Half-Yearly",
        Yearly => "Yearly",
    }
}

choice_enum! {
    /// Market the bond was bought on
    PurchaseType, default = Primary,
    {
        Primary => "Primary",
        Secondary => "Secondary",
    }
}

choice_enum! {
    BondStatus, default = Active,
    {
        Active => "Active",
        Closed => "Closed",
    }
}

choice_enum! {
    ClosedFlag, default = No,
    {
        Yes => "Yes",
        No => "No",
    }
}

/// Options for the expected interest day-of-month
pub const EXPECTED_DAY_OPTIONS: [&str; 31] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "23", "24", "25", "26", "27", "28", "29", "30", "31",
];

// ============================================================================
// Field Values
// ============================================================================

/// A master-field value as seen by editors, exporters and importers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric reading; text that is not a number counts as 0
    pub fn as_number(&self) -> f64 {
        match self {
            FieldValue::Number(n) if n.is_finite() => *n,
            FieldValue::Number(_) => 0.0,
            FieldValue::Text(s) => coerce_amount(s),
        }
    }

    /// Text reading; numbers are written without a trailing `.0`
    pub fn into_text(self) -> String {
        match self {
            FieldValue::Number(n) => format_number(n),
            FieldValue::Text(s) => s,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

/// Coerce user or spreadsheet text to an amount
///
/// Blank, non-numeric and non-finite input all become 0.
pub fn coerce_amount(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Render a number as plain text (`5` rather than `5.0`)
pub fn format_number(n: f64) -> String {
    if n.is_finite() {
        n.to_string()
    } else {
        String::new()
    }
}

// ============================================================================
// Bond
// ============================================================================

/// One tracked bond and its monthly cash-flow schedule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bond {
    #[serde(rename = "Bond", deserialize_with = "lenient::text")]
    pub name: String,
    /// Day of month interest is expected, `"1"`..`"31"`
    #[serde(rename = "Expected_Interest_Month_Date", deserialize_with = "lenient::text")]
    pub expected_interest_day: String,
    /// Percent, kept as entered
    #[serde(rename = "Interest_Rate", deserialize_with = "lenient::text")]
    pub interest_rate: String,
    #[serde(rename = "Interest_Frequency", deserialize_with = "lenient::text")]
    pub interest_frequency: String,
    /// Face amount
    #[serde(rename = "BondAmount", deserialize_with = "lenient::amount")]
    pub bond_amount: f64,
    #[serde(rename = "Invested_Amount", deserialize_with = "lenient::amount")]
    pub invested_amount: f64,
    #[serde(rename = "MaturityDate", deserialize_with = "lenient::text")]
    pub maturity_date: String,
    #[serde(rename = "Platform", deserialize_with = "lenient::text")]
    pub platform: String,
    #[serde(rename = "Account", deserialize_with = "lenient::text")]
    pub account: String,
    #[serde(rename = "BankAccount", deserialize_with = "lenient::text")]
    pub bank_account: String,
    #[serde(rename = "BondPurchaseType", deserialize_with = "lenient::text")]
    pub purchase_type: String,
    #[serde(rename = "Status", deserialize_with = "lenient::text")]
    pub status: String,
    #[serde(rename = "Settlement Date", alias = "SettlementDate", deserialize_with = "lenient::text")]
    pub settlement_date: String,
    #[serde(rename = "ISIN", deserialize_with = "lenient::text")]
    pub isin: String,
    #[serde(rename = "Closed?", alias = "Closed", deserialize_with = "lenient::text")]
    pub closed: String,
    #[serde(rename = "Comment", alias = "Comments", deserialize_with = "lenient::text")]
    pub comment: String,
    /// Cash flow per month; every schema month is present once reconciled
    #[serde(deserialize_with = "lenient::months")]
    pub months: BTreeMap<Month, f64>,
}

impl Default for Bond {
    fn default() -> Self {
        Self {
            name: String::new(),
            expected_interest_day: EXPECTED_DAY_OPTIONS[0].to_string(),
            interest_rate: String::new(),
            interest_frequency: InterestFrequency::default().as_str().to_string(),
            bond_amount: 0.0,
            invested_amount: 0.0,
            maturity_date: String::new(),
            platform: String::new(),
            account: String::new(),
            bank_account: String::new(),
            purchase_type: PurchaseType::default().as_str().to_string(),
            status: BondStatus::default().as_str().to_string(),
            settlement_date: String::new(),
            isin: String::new(),
            closed: ClosedFlag::default().as_str().to_string(),
            comment: String::new(),
            months: BTreeMap::new(),
        }
    }
}

impl Bond {
    /// Bond with master defaults and no monthly entries
    ///
    /// Use [`crate::Schema::empty_record`] to get one with every month present.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style field assignment
    pub fn with(mut self, field: MasterField, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Builder-style month assignment
    pub fn with_amount(mut self, month: Month, amount: f64) -> Self {
        self.set_amount(month, amount);
        self
    }

    /// Read a master field
    pub fn get(&self, field: MasterField) -> FieldValue {
        match field {
            MasterField::BondAmount => FieldValue::Number(self.bond_amount),
            MasterField::InvestedAmount => FieldValue::Number(self.invested_amount),
            _ => FieldValue::Text(self.text(field).cloned().unwrap_or_default()),
        }
    }

    /// Write a master field, coercing to the field's storage type
    pub fn set(&mut self, field: MasterField, value: impl Into<FieldValue>) {
        let value = value.into();
        match field {
            MasterField::BondAmount => self.bond_amount = value.as_number(),
            MasterField::InvestedAmount => self.invested_amount = value.as_number(),
            _ => {
                if let Some(slot) = self.text_mut(field) {
                    *slot = value.into_text();
                }
            }
        }
    }

    fn text(&self, field: MasterField) -> Option<&String> {
        let slot = match field {
            MasterField::Bond => &self.name,
            MasterField::ExpectedInterestDay => &self.expected_interest_day,
            MasterField::InterestRate => &self.interest_rate,
            MasterField::InterestFrequency => &self.interest_frequency,
            MasterField::MaturityDate => &self.maturity_date,
            MasterField::Platform => &self.platform,
            MasterField::Account => &self.account,
            MasterField::BankAccount => &self.bank_account,
            MasterField::PurchaseType => &self.purchase_type,
            MasterField::Status => &self.status,
            MasterField::SettlementDate => &self.settlement_date,
            MasterField::Isin => &self.isin,
            MasterField::Closed => &self.closed,
            MasterField::Comment => &self.comment,
            MasterField::BondAmount | MasterField::InvestedAmount => return None,
        };
        Some(slot)
    }

    fn text_mut(&mut self, field: MasterField) -> Option<&mut String> {
        let slot = match field {
            MasterField::Bond => &mut self.name,
            MasterField::ExpectedInterestDay => &mut self.expected_interest_day,
            MasterField::InterestRate => &mut self.interest_rate,
            MasterField::InterestFrequency => &mut self.interest_frequency,
            MasterField::MaturityDate => &mut self.maturity_date,
            MasterField::Platform => &mut self.platform,
            MasterField::Account => &mut self.account,
            MasterField::BankAccount => &mut self.bank_account,
            MasterField::PurchaseType => &mut self.purchase_type,
            MasterField::Status => &mut self.status,
            MasterField::SettlementDate => &mut self.settlement_date,
            MasterField::Isin => &mut self.isin,
            MasterField::Closed => &mut self.closed,
            MasterField::Comment => &mut self.comment,
            MasterField::BondAmount | MasterField::InvestedAmount => return None,
        };
        Some(slot)
    }

    /// Amount booked in `month`, 0 when absent
    pub fn amount(&self, month: Month) -> f64 {
        self.months
            .get(&month)
            .copied()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0)
    }

    pub fn set_amount(&mut self, month: Month, amount: f64) {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        self.months.insert(month, amount);
    }

    /// Parsed maturity date; `None` means no maturity constraint
    pub fn maturity(&self) -> Option<NaiveDate> {
        parse_date_only(&self.maturity_date)
    }

    pub fn settlement(&self) -> Option<NaiveDate> {
        parse_date_only(&self.settlement_date)
    }

    pub fn frequency(&self) -> Option<InterestFrequency> {
        InterestFrequency::parse(&self.interest_frequency)
    }

    pub fn purchase(&self) -> Option<PurchaseType> {
        PurchaseType::parse(&self.purchase_type)
    }

    pub fn bond_status(&self) -> Option<BondStatus> {
        BondStatus::parse(&self.status)
    }

    pub fn closed_flag(&self) -> Option<ClosedFlag> {
        ClosedFlag::parse(&self.closed)
    }

    /// Expected interest day, when it is a valid day of month
    pub fn interest_day(&self) -> Option<u32> {
        self.expected_interest_day
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|d| (1..=31).contains(d))
    }

    /// Whether this record is the reserved aggregate row
    pub fn is_total_marker(&self) -> bool {
        is_total_label(&self.name)
    }
}

/// Tolerant deserializers for records saved by older versions of the tool,
/// which stored numbers as text, text as numbers and failed parses as `null`.
mod lenient {
    use super::{coerce_amount, format_number};
    use crate::month::{parse_month_label, Month};
    use serde::{Deserialize, Deserializer};
    use std::collections::BTreeMap;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Number(f64),
        Text(String),
        Flag(bool),
    }

    impl Scalar {
        fn into_amount(self) -> f64 {
            match self {
                Scalar::Number(n) if n.is_finite() => n,
                Scalar::Number(_) => 0.0,
                Scalar::Text(s) => coerce_amount(&s),
                Scalar::Flag(b) => f64::from(u8::from(b)),
            }
        }

        fn into_text(self) -> String {
            match self {
                Scalar::Number(n) => format_number(n),
                Scalar::Text(s) => s,
                Scalar::Flag(b) => b.to_string(),
            }
        }
    }

    pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Scalar>::deserialize(deserializer)?
            .map(Scalar::into_text)
            .unwrap_or_default())
    }

    pub fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Scalar>::deserialize(deserializer)?
            .map(Scalar::into_amount)
            .unwrap_or(0.0))
    }

    pub fn months<'de, D>(deserializer: D) -> Result<BTreeMap<Month, f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<BTreeMap<String, Option<Scalar>>>::deserialize(deserializer)?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(label, value)| {
                let month = parse_month_label(&label)?;
                Some((month, value.map(Scalar::into_amount).unwrap_or(0.0)))
            })
            .collect())
    }
}
