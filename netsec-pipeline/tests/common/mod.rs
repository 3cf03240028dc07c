//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use netsec_pipeline::config::{PipelineSettings, ValidationPolicy};
use netsec_pipeline::data::schema::{ColumnSchema, ColumnType, SchemaDefinition};
use netsec_pipeline::persistence;

pub const FEATURES: [&str; 5] = [
    "having_IP_Address",
    "URL_Length",
    "SSLfinal_State",
    "Prefix_Suffix",
    "Domain_registeration_length",
];

/// A phishing-style CSV with `n` records. `Result` follows `SSLfinal_State`,
/// a few `URL_Length` cells are `na`.
pub fn source_csv(n: usize) -> String {
    let mut out = FEATURES.join(",");
    out.push_str(",Result\n");
    for i in 0..n {
        let label: i64 = if (i * 13) % 5 < 3 { 1 } else { -1 };
        let url_length = if i % 11 == 0 {
            "na".to_string()
        } else {
            ((i * 7 % 3) as i64 - 1).to_string()
        };
        let row = [
            ((i * 3 % 2) as i64 * 2 - 1).to_string(),
            url_length,
            label.to_string(),
            ((i / 3 % 2) as i64 * 2 - 1).to_string(),
            ((i * 5 % 3) as i64 - 1).to_string(),
            label.to_string(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn schema() -> SchemaDefinition {
    let columns = FEATURES
        .iter()
        .chain(["Result"].iter())
        .map(|name| ColumnSchema {
            name: name.to_string(),
            dtype: ColumnType::Integer,
            nullable: true,
            description: None,
        })
        .collect();
    SchemaDefinition {
        columns,
        numerical_columns: FEATURES.iter().map(|c| c.to_string()).collect(),
    }
}

/// Workspace under `dir`: source CSV, schema, and settings pointing at both.
pub fn workspace(dir: &Path, n: usize, ratio: f64, policy: ValidationPolicy) -> PipelineSettings {
    let source = dir.join("phisingData.csv");
    std::fs::write(&source, source_csv(n)).unwrap();
    let schema_file = dir.join("schema.yaml");
    persistence::atomic_write_yaml(&schema_file, &schema()).unwrap();

    let mut settings = PipelineSettings {
        artifact_root: dir.join("Artifacts"),
        ..Default::default()
    };
    settings.ingestion.source_file = source;
    settings.ingestion.test_ratio = ratio;
    settings.validation.schema_file = schema_file;
    settings.validation.policy = policy;
    settings.training.overfitting_threshold = 1.0;
    settings
}

/// Point the schema at a column the source does not have.
pub fn break_schema(settings: &PipelineSettings) {
    let mut schema = schema();
    schema.columns.push(ColumnSchema {
        name: "Page_Rank".into(),
        dtype: ColumnType::Integer,
        nullable: true,
        description: None,
    });
    persistence::atomic_write_yaml(&settings.validation.schema_file, &schema).unwrap();
}

pub fn instant(second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 2, 14)
        .unwrap()
        .and_hms_opt(9, 30, second)
        .unwrap()
}

pub fn source_path(settings: &PipelineSettings) -> PathBuf {
    settings.ingestion.source_file.clone()
}
