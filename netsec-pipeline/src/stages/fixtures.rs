//! Shared test data for the stage tests.

use std::path::Path;

use serde_json::{Value, json};
use tracing::Span;

use crate::config::PipelineSettings;
use crate::data::schema::{ColumnSchema, ColumnType, SchemaDefinition};
use crate::data::source::{DataBatch, write_csv};
use crate::persistence;
use crate::pipeline::artifact::{IngestionArtifact, TransformationArtifact};
use crate::pipeline::config::{
    IngestionConfig, RootConfig, TransformationConfig, ValidationConfig,
};
use crate::pipeline::stage::Stage;
use crate::stages::{DataTransformation, DataValidation};

const INTEGER_COLUMNS: [&str; 4] = [
    "having_IP_Address",
    "url_length",
    "SSLfinal_State",
    "having_At_Symbol",
];

/// `n` phishing-style records; `Result` follows `SSLfinal_State` exactly.
pub(crate) fn phishing_batch(n: usize) -> DataBatch {
    let rows = (0..n)
        .map(|i| {
            let label: i64 = if i % 2 == 0 { 1 } else { -1 };
            let url_length: Value = if i % 7 == 0 {
                json!("na")
            } else {
                json!((i * 5 % 3) as i64 - 1)
            };
            vec![
                json!((i * 7 % 3) as i64 - 1),
                url_length,
                json!(label),
                json!(if i % 3 == 0 { 1 } else { -1 }),
                json!(if label == 1 && i % 4 == 0 { "https" } else { "http" }),
                json!(label),
            ]
        })
        .collect();
    let mut columns: Vec<String> = INTEGER_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.push("protocol".into());
    columns.push("Result".into());
    DataBatch::new(columns, rows)
}

pub(crate) fn schema() -> SchemaDefinition {
    let mut columns: Vec<ColumnSchema> = INTEGER_COLUMNS
        .iter()
        .chain(["Result"].iter())
        .map(|name| column(name, ColumnType::Integer))
        .collect();
    columns.insert(4, column("protocol", ColumnType::String));
    let mut numerical_columns: Vec<String> =
        INTEGER_COLUMNS.iter().map(|c| c.to_string()).collect();
    numerical_columns.push("Result".into());
    SchemaDefinition {
        columns,
        numerical_columns,
    }
}

fn column(name: &str, dtype: ColumnType) -> ColumnSchema {
    ColumnSchema {
        name: name.to_string(),
        dtype,
        nullable: true,
        description: None,
    }
}

pub(crate) fn write_schema_with_extra_column(path: &Path) {
    let mut schema = schema();
    schema.columns.push(column("Page_Rank", ColumnType::Integer));
    persistence::atomic_write_yaml(path, &schema).unwrap();
}

/// Settings pointing into `dir`, with the schema written and the run directory created.
pub(crate) fn root(dir: &Path) -> RootConfig {
    let mut settings = PipelineSettings {
        artifact_root: dir.join("artifacts"),
        ..Default::default()
    };
    settings.validation.schema_file = dir.join("schema.yaml");
    persistence::atomic_write_yaml(&settings.validation.schema_file, &schema()).unwrap();

    let root = RootConfig::at(
        settings,
        chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap(),
    );
    std::fs::create_dir_all(root.artifact_dir()).unwrap();
    root
}

pub(crate) fn ingestion_config(dir: &Path, ratio: f64) -> IngestionConfig {
    let mut config = IngestionConfig::from_root(&root(dir)).unwrap();
    config.test_ratio = ratio;
    config
}

/// Ingestion output written by hand: the first `train_n` and `test_n`
/// records of [`phishing_batch`].
pub(crate) fn ingested(root: &RootConfig, train_n: usize, test_n: usize) -> IngestionArtifact {
    write_ingested(root, phishing_batch(train_n), phishing_batch(test_n))
}

/// Like [`ingested`], but every known `url_length` in test is shifted far away.
pub(crate) fn ingested_with_shift(root: &RootConfig, n: usize) -> IngestionArtifact {
    let mut test = phishing_batch(n);
    let idx = test.column_index("url_length").unwrap();
    for row in &mut test.rows {
        if let Some(v) = row[idx].as_i64() {
            row[idx] = json!(v + 10);
        }
    }
    write_ingested(root, phishing_batch(n), test)
}

fn write_ingested(root: &RootConfig, train: DataBatch, test: DataBatch) -> IngestionArtifact {
    let config = IngestionConfig::from_root(root).unwrap();
    let mut all = train.clone();
    all.rows.extend(test.rows.iter().cloned());
    write_csv(&config.feature_store_file, &all, ',').unwrap();
    write_csv(&config.train_file, &train, ',').unwrap();
    write_csv(&config.test_file, &test, ',').unwrap();
    IngestionArtifact::new(
        config.feature_store_file,
        config.train_file,
        config.test_file,
        train.row_count(),
        test.row_count(),
    )
    .unwrap()
}

/// Run validation and transformation over hand-written ingestion output.
pub(crate) fn transformed(root: &RootConfig, train_n: usize, test_n: usize) -> TransformationArtifact {
    let ingestion = ingested(root, train_n, test_n);
    let validation = DataValidation::new(ValidationConfig::from_root(root).unwrap(), &ingestion)
        .initiate(&Span::none())
        .unwrap();
    DataTransformation::new(TransformationConfig::from_root(root).unwrap(), &validation)
        .initiate(&Span::none())
        .unwrap()
}
