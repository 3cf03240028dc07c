//! Column encodings that turn table cells into numbers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::source::as_number;

/// How one feature column becomes a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnEncoding {
    /// Numbers pass through; anything unparseable becomes missing.
    Numeric,
    /// Categories seen while fitting map to their sorted position.
    Ordinal(OrdinalEncoder),
}

impl ColumnEncoding {
    /// Pick an encoding from the training values of a column.
    pub fn infer<'a>(values: impl Iterator<Item = &'a Value> + Clone) -> Self {
        let all_numeric = values
            .clone()
            .filter(|v| !v.is_null())
            .all(|v| as_number(v).is_some());
        if all_numeric {
            ColumnEncoding::Numeric
        } else {
            ColumnEncoding::Ordinal(OrdinalEncoder::fit(values))
        }
    }

    /// Encode one cell; `NaN` marks a missing value.
    pub fn encode(&self, value: &Value) -> f64 {
        match self {
            ColumnEncoding::Numeric => as_number(value).unwrap_or(f64::NAN),
            ColumnEncoding::Ordinal(encoder) => encoder.encode(value),
        }
    }
}

/// Ordinal encoder over the sorted set of training categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    pub categories: Vec<String>,
}

impl OrdinalEncoder {
    pub fn fit<'a>(values: impl Iterator<Item = &'a Value>) -> Self {
        let mut categories: Vec<String> = values.filter_map(category_key).collect();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    /// Position of the category, or `NaN` if it is missing or was never seen.
    pub fn encode(&self, value: &Value) -> f64 {
        category_key(value)
            .and_then(|key| self.categories.binary_search(&key).ok())
            .map_or(f64::NAN, |pos| pos as f64)
    }
}

fn category_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
