//! Schema definition, column type inference and conformance checks for datasets.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::source::DataBatch;
use crate::error::{Fault, Result, ResultExt};
use crate::persistence;

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Unknown,
}

impl ColumnType {
    /// Whether an observed column type satisfies this expected type.
    ///
    /// An all-missing column satisfies any type; integers satisfy `Float`.
    pub fn accepts(self, observed: ColumnType) -> bool {
        match (self, observed) {
            (_, ColumnType::Null) => true,
            (ColumnType::Float, ColumnType::Integer) => true,
            (ColumnType::String, _) => true,
            (ColumnType::Unknown, _) => true,
            (expected, observed) => expected == observed,
        }
    }
}

/// Schema definition for a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub columns: Vec<ColumnSchema>,
    /// Columns that must hold numbers. Drift screening covers every numeric
    /// train column, not only these.
    #[serde(default)]
    pub numerical_columns: Vec<String>,
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl SchemaDefinition {
    /// Load a schema from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Fault::MissingFile(path.to_path_buf())).at("SchemaDefinition::load");
        }
        persistence::read_yaml(path).at("SchemaDefinition::load")
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Every way `batch` departs from this schema, as readable messages.
    ///
    /// An empty list means the batch conforms.
    pub fn violations(&self, batch: &DataBatch, label: &str) -> Vec<String> {
        let mut out = Vec::new();

        if batch.column_count() != self.columns.len() {
            out.push(format!(
                "{label}: expected {} columns, found {}",
                self.columns.len(),
                batch.column_count()
            ));
        }

        for column in &self.columns {
            let Some(idx) = batch.column_index(&column.name) else {
                out.push(format!("{label}: missing column '{}'", column.name));
                continue;
            };
            let values: Vec<Value> = batch.column(idx).cloned().collect();
            let observed = infer_column_type(&values);
            if !column.dtype.accepts(observed) {
                out.push(format!(
                    "{label}: column '{}' expected {:?}, found {:?}",
                    column.name, column.dtype, observed
                ));
            }
            if !column.nullable && values.iter().any(|v| v.is_null()) {
                out.push(format!(
                    "{label}: column '{}' is not nullable but has missing values",
                    column.name
                ));
            }
        }

        for name in &self.numerical_columns {
            let Some(idx) = batch.column_index(name) else {
                out.push(format!("{label}: missing numerical column '{name}'"));
                continue;
            };
            let non_numeric = batch
                .column(idx)
                .filter(|v| !v.is_null() && crate::data::source::as_number(v).is_none())
                .count();
            if non_numeric > 0 {
                out.push(format!(
                    "{label}: numerical column '{name}' has {non_numeric} non-numeric values"
                ));
            }
        }

        out
    }
}

/// Infer column type from a sample of values.
pub fn infer_column_type(values: &[Value]) -> ColumnType {
    let non_null: Vec<_> = values.iter().filter(|v| !v.is_null()).collect();
    if non_null.is_empty() {
        return ColumnType::Null;
    }

    let mut has_int = false;
    let mut has_float = false;
    let mut has_bool = false;
    let mut has_string = false;

    for v in &non_null {
        match v {
            Value::Number(n) => {
                if n.is_f64() {
                    has_float = true;
                } else {
                    has_int = true;
                }
            }
            Value::Bool(_) => has_bool = true,
            Value::String(_) => has_string = true,
            _ => {}
        }
    }

    if has_string {
        return ColumnType::String;
    }
    if has_float {
        return ColumnType::Float;
    }
    if has_int {
        return ColumnType::Integer;
    }
    if has_bool {
        return ColumnType::Boolean;
    }
    ColumnType::Unknown
}
