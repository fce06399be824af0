//! Spreadsheet cell contents
//!
//! Workbook readers hand back cells in three shapes: plain values, formulas
//! (with the value last computed by the spreadsheet application) and styled
//! rich text split into runs. [`CellContent::resolve`] collapses all of them
//! into a [`CellScalar`]. A formula expression is never returned as data.

use bondledger_core::{coerce_amount, format_number};
use serde::Deserialize;
use serde_json::Value;

/// A plain cell value
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellScalar {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellScalar {
    /// Empty, or text that is only whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            CellScalar::Empty => true,
            CellScalar::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric reading; anything that is not a finite number is 0
    pub fn as_amount(&self) -> f64 {
        match self {
            CellScalar::Number(n) if n.is_finite() => *n,
            CellScalar::Text(s) => coerce_amount(s),
            _ => 0.0,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            CellScalar::Empty => String::new(),
            CellScalar::Number(n) => format_number(*n),
            CellScalar::Text(s) => s.clone(),
            CellScalar::Bool(b) => b.to_string(),
        }
    }

    /// Map a JSON value; objects and arrays carry no scalar
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map_or(CellScalar::Empty, CellScalar::Number),
            Value::String(s) => CellScalar::Text(s.clone()),
            Value::Bool(b) => CellScalar::Bool(*b),
            Value::Null | Value::Array(_) | Value::Object(_) => CellScalar::Empty,
        }
    }
}

impl From<&str> for CellScalar {
    fn from(s: &str) -> Self {
        CellScalar::Text(s.to_string())
    }
}

impl From<f64> for CellScalar {
    fn from(n: f64) -> Self {
        CellScalar::Number(n)
    }
}

/// A cell as read from a workbook
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "RawCell")]
pub enum CellContent {
    Scalar(CellScalar),
    Formula {
        expression: String,
        /// Value computed by the application that saved the file
        cached: Option<CellScalar>,
    },
    /// Styled text, one entry per run
    RichText(Vec<String>),
}

impl CellContent {
    /// Plain value of the cell
    pub fn resolve(&self) -> CellScalar {
        match self {
            CellContent::Scalar(value) => value.clone(),
            CellContent::Formula { cached, .. } => cached.clone().unwrap_or_default(),
            CellContent::RichText(runs) => CellScalar::Text(runs.concat()),
        }
    }
}

impl Default for CellContent {
    fn default() -> Self {
        CellContent::Scalar(CellScalar::Empty)
    }
}

impl From<CellScalar> for CellContent {
    fn from(value: CellScalar) -> Self {
        CellContent::Scalar(value)
    }
}

/// Cell shapes emitted by JavaScript workbook libraries
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCell {
    Formula {
        #[serde(alias = "sharedFormula")]
        formula: String,
        #[serde(default)]
        result: Option<Value>,
    },
    RichText {
        #[serde(rename = "richText")]
        rich_text: Vec<RichRun>,
    },
    /// Hyperlinks and other display-text wrappers
    Display { text: Value },
    Plain(Value),
}

#[derive(Deserialize)]
struct RichRun {
    #[serde(default)]
    text: String,
}

impl From<RawCell> for CellContent {
    fn from(raw: RawCell) -> Self {
        match raw {
            RawCell::Formula { formula, result } => CellContent::Formula {
                expression: formula,
                cached: result
                    .as_ref()
                    .map(CellScalar::from_json)
                    .filter(|v| *v != CellScalar::Empty),
            },
            RawCell::RichText { rich_text } => {
                CellContent::RichText(rich_text.into_iter().map(|r| r.text).collect())
            }
            RawCell::Display { text } => CellContent::Scalar(CellScalar::from_json(&text)),
            RawCell::Plain(value) => CellContent::Scalar(CellScalar::from_json(&value)),
        }
    }
}
