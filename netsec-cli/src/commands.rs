//! Subcommand handlers.

use std::path::{Path, PathBuf};

use netsec_pipeline::data::{CsvSource, DataBatch, read_csv, write_csv};
use netsec_pipeline::{NetworkModel, TrainingPipeline, load_settings};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::Commands;

/// Name of the column appended by `predict`.
pub const PREDICTION_COLUMN: &str = "predicted_column";

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    /// Stop before transformation when validation fails
    Halt,
    /// Keep going and keep the failed validation in the artifact chain
    Record,
}

impl PolicyArg {
    fn as_str(self) -> &'static str {
        match self {
            PolicyArg::Halt => "halt",
            PolicyArg::Record => "record",
        }
    }
}

pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Train {
            source,
            schema,
            artifact_root,
            seed,
            validation_policy,
        } => {
            // Paths given on the command line are relative to the caller,
            // not the workspace.
            let source = source.map(std::path::absolute).transpose()?;
            let schema = schema.map(std::path::absolute).transpose()?;
            let artifact_root = artifact_root.map(std::path::absolute).transpose()?;
            let overrides = train_overrides(
                source.as_deref(),
                schema.as_deref(),
                artifact_root.as_deref(),
                seed,
                validation_policy,
            );
            let settings = load_settings(Some(workspace), config, Some(&overrides))?;
            let source = CsvSource::new(
                settings.ingestion.source_file.clone(),
                settings.ingestion.delimiter,
            );

            let mut pipeline = TrainingPipeline::new(settings, source)?;
            let run = pipeline.run()?;
            println!("{}", serde_json::to_string_pretty(&run)?);
            Ok(())
        }
        Commands::Predict {
            model,
            input,
            output,
        } => {
            let settings = load_settings(Some(workspace), config, None)?;
            let written = predict(&model, &input, &output, settings.ingestion.delimiter)?;
            println!("{}", written.display());
            Ok(())
        }
    }
}

/// Partial settings object holding only the flags that were given.
pub fn train_overrides(
    source: Option<&Path>,
    schema: Option<&Path>,
    artifact_root: Option<&Path>,
    seed: Option<u64>,
    policy: Option<PolicyArg>,
) -> Value {
    let mut root = Map::new();
    if let Some(dir) = artifact_root {
        root.insert("artifact_root".into(), json!(dir));
    }
    if let Some(seed) = seed {
        root.insert("seed".into(), json!(seed));
    }
    if let Some(source) = source {
        root.insert("ingestion".into(), json!({ "source_file": source }));
    }
    let mut validation = Map::new();
    if let Some(schema) = schema {
        validation.insert("schema_file".into(), json!(schema));
    }
    if let Some(policy) = policy {
        validation.insert("policy".into(), json!(policy.as_str()));
    }
    if !validation.is_empty() {
        root.insert("validation".into(), Value::Object(validation));
    }
    Value::Object(root)
}

/// Score every record of `input` and write it, with predictions, to `output`.
pub fn predict(
    model: &Path,
    input: &Path,
    output: &Path,
    delimiter: char,
) -> anyhow::Result<PathBuf> {
    let model = NetworkModel::load(model)?;
    let batch = read_csv(input, delimiter)?;
    let labels = model.predict(&batch)?;
    info!(records = labels.len(), input = %input.display(), "Batch scored");

    let scored = with_predictions(batch, &labels);
    write_csv(output, &scored, delimiter)?;
    Ok(output.to_path_buf())
}

fn with_predictions(mut batch: DataBatch, labels: &[u8]) -> DataBatch {
    batch.columns.push(PREDICTION_COLUMN.to_string());
    for (row, &label) in batch.rows.iter_mut().zip(labels) {
        row.push(json!(label));
    }
    batch
}
