//! Data source abstraction and the delimited-text table codec.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Fault, Result, ResultExt};
use crate::persistence;

/// Tokens that are read as a missing value.
const MISSING_TOKENS: &[&str] = &["", "na", "NA", "NaN", "nan", "null"];

/// A batch of data rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl DataBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, `Null` where a row is short.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> + Clone {
        self.rows
            .iter()
            .map(move |row| row.get(idx).unwrap_or(&Value::Null))
    }

    /// Non-missing numeric values of one column.
    pub fn numeric_values(&self, idx: usize) -> Vec<f64> {
        self.column(idx).filter_map(as_number).collect()
    }

    /// New batch holding the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> DataBatch {
        DataBatch {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Render as delimited text with a header line.
    pub fn to_csv_string(&self, delimiter: char) -> String {
        let mut out = String::new();
        push_record(&mut out, self.columns.iter().map(|c| c.as_str()), delimiter);
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(render_cell).collect();
            push_record(&mut out, cells.iter().map(|c| c.as_str()), delimiter);
        }
        out
    }

    /// Parse delimited text with a header line.
    pub fn from_csv_str(content: &str, delimiter: char) -> Result<DataBatch> {
        parse_csv(content, delimiter).at("DataBatch::from_csv_str")
    }
}

/// Numeric view of a cell; textual numbers count, missing values do not.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Information about a data source for lineage tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
}

/// Trait for loading data from a source.
pub trait DataSource {
    /// Load every record of this source.
    fn load(&self) -> Result<DataBatch>;

    /// Return metadata about this source for lineage tracking.
    fn source_info(&self) -> DataSourceInfo;
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// CSV file data source.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: char,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, delimiter: char) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }
}

impl DataSource for CsvSource {
    fn load(&self) -> Result<DataBatch> {
        read_csv(&self.path, self.delimiter).at("CsvSource::load")
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "csv".to_string(),
            location: self.path.display().to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// InMemorySource
// ---------------------------------------------------------------------------

/// A source backed by an already loaded batch.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    batch: DataBatch,
}

impl InMemorySource {
    pub fn new(batch: DataBatch) -> Self {
        Self { batch }
    }
}

impl DataSource for InMemorySource {
    fn load(&self) -> Result<DataBatch> {
        Ok(self.batch.clone())
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "memory".to_string(),
            location: "memory".to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}

/// Read a delimited file; a missing file is reported as such.
pub fn read_csv(path: &Path, delimiter: char) -> Result<DataBatch> {
    if !path.is_file() {
        return Err(Fault::MissingFile(path.to_path_buf())).at("data::read_csv");
    }
    let content = std::fs::read_to_string(path).at("data::read_csv")?;
    parse_csv(&content, delimiter).at("data::read_csv")
}

/// Atomically write a batch as a delimited file.
pub fn write_csv(path: &Path, batch: &DataBatch, delimiter: char) -> Result<()> {
    persistence::atomic_write(path, batch.to_csv_string(delimiter).as_bytes()).at("data::write_csv")
}

fn parse_csv(content: &str, delimiter: char) -> std::result::Result<DataBatch, Fault> {
    let mut lines = content.lines().enumerate();

    let (_, header) = lines
        .find(|(_, l)| !l.trim().is_empty())
        .ok_or_else(|| Fault::dataset("Empty CSV input"))?;
    let (header, _) = split_record(header, delimiter);
    let columns: Vec<String> = header.into_iter().map(|s| s.trim().to_string()).collect();

    let mut rows = Vec::new();
    // Record still inside a quoted field, with the line it started on.
    let mut pending: Option<(usize, String)> = None;
    for (line_no, line) in lines {
        let (start, record) = match pending.take() {
            Some((start, mut record)) => {
                record.push('\n');
                record.push_str(line);
                (start, record)
            }
            // A blank line is a lone missing cell in a one-column table.
            None if line.trim().is_empty() && columns.len() > 1 => continue,
            None => (line_no, line.to_string()),
        };
        let (cells, open) = split_record(&record, delimiter);
        if open {
            pending = Some((start, record));
            continue;
        }
        if cells.len() != columns.len() {
            return Err(Fault::dataset(format!(
                "line {}: expected {} fields, found {}",
                start + 1,
                columns.len(),
                cells.len()
            )));
        }
        rows.push(cells.iter().map(|c| parse_cell(c)).collect());
    }
    if let Some((start, _)) = pending {
        return Err(Fault::dataset(format!(
            "line {}: unterminated quoted field",
            start + 1
        )));
    }

    Ok(DataBatch { columns, rows })
}

/// Split one record, honouring double-quoted fields with `""` escapes.
///
/// The flag is set when the record ends inside an open quote, i.e. the field
/// continues on the next line.
fn split_record(record: &str, delimiter: char) -> (Vec<String>, bool) {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = record.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            c if c == delimiter && !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    fields.push(current);
    (fields, in_quotes)
}

fn parse_cell(raw: &str) -> Value {
    let s = raw.trim();
    if MISSING_TOKENS.contains(&s) {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = s.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_record<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, delimiter: char) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        if cell.contains(delimiter) || cell.contains('"') || cell.contains('\n') {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}
