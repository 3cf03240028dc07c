//! Layered pipeline settings.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! The resulting [`PipelineSettings`] is embedded read-only in the run's
//! [`RootConfig`](crate::pipeline::RootConfig); stage configs are derived from
//! it and never consult the environment themselves.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ResultExt};

/// Name of the workspace-local settings file.
pub const SETTINGS_FILE_NAME: &str = "netsec.toml";

/// Prefix for environment overrides (`NETSEC_INGESTION__TEST_RATIO`, ...).
pub const ENV_PREFIX: &str = "NETSEC_";

/// Top-level settings for one training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_pipeline_name")]
    pub pipeline_name: String,
    /// Directory under which every run gets its own timestamped subdirectory.
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,
    /// Global seed; the split and the trainer derive their seeds from it.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub ingestion: IngestionSettings,
    #[serde(default)]
    pub validation: ValidationSettings,
    #[serde(default)]
    pub transformation: TransformationSettings,
    #[serde(default)]
    pub training: TrainingSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            pipeline_name: default_pipeline_name(),
            artifact_root: default_artifact_root(),
            seed: default_seed(),
            ingestion: IngestionSettings::default(),
            validation: ValidationSettings::default(),
            transformation: TransformationSettings::default(),
            training: TrainingSettings::default(),
        }
    }
}

impl PipelineSettings {
    /// Resolve relative file locations against `base`; absolute ones are kept.
    pub fn anchored_at(mut self, base: &Path) -> Self {
        self.artifact_root = base.join(&self.artifact_root);
        self.ingestion.source_file = base.join(&self.ingestion.source_file);
        self.validation.schema_file = base.join(&self.validation.schema_file);
        self
    }
}

/// Where raw records come from and how they are split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionSettings {
    #[serde(default = "default_source_file")]
    pub source_file: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Fraction of records that go to the test split.
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            source_file: default_source_file(),
            delimiter: default_delimiter(),
            test_ratio: default_test_ratio(),
        }
    }
}

/// What the orchestrator does when validation reports a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Stop before transformation with a `ValidationRejected` fault.
    #[default]
    Halt,
    /// Keep going; the failed validation artifact stays in the chain.
    Record,
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationPolicy::Halt => write!(f, "halt"),
            ValidationPolicy::Record => write!(f, "record"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// YAML file describing the expected columns.
    #[serde(default = "default_schema_file")]
    pub schema_file: PathBuf,
    /// Drift is declared for a column when the KS p-value falls below this.
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,
    #[serde(default)]
    pub policy: ValidationPolicy,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            schema_file: default_schema_file(),
            drift_threshold: default_drift_threshold(),
            policy: ValidationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationSettings {
    #[serde(default = "default_target_column")]
    pub target_column: String,
    #[serde(default = "default_knn_neighbors")]
    pub knn_neighbors: usize,
}

impl Default for TransformationSettings {
    fn default() -> Self {
        Self {
            target_column: default_target_column(),
            knn_neighbors: default_knn_neighbors(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// L2 penalty applied to the weights (not the bias).
    #[serde(default = "default_l2")]
    pub l2: f64,
    /// Minimum train f1 score for the model to be accepted.
    #[serde(default = "default_expected_score")]
    pub expected_score: f64,
    /// Maximum allowed |train f1 - test f1|.
    #[serde(default = "default_overfitting_threshold")]
    pub overfitting_threshold: f64,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            l2: default_l2(),
            expected_score: default_expected_score(),
            overfitting_threshold: default_overfitting_threshold(),
        }
    }
}

fn default_pipeline_name() -> String {
    "NetworkSecurity".to_string()
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from("Artifacts")
}

fn default_seed() -> u64 {
    42
}

fn default_source_file() -> PathBuf {
    PathBuf::from("network_data/phisingData.csv")
}

fn default_delimiter() -> char {
    ','
}

fn default_test_ratio() -> f64 {
    0.2
}

fn default_schema_file() -> PathBuf {
    PathBuf::from("data_schema/schema.yaml")
}

fn default_drift_threshold() -> f64 {
    0.05
}

fn default_target_column() -> String {
    "Result".to_string()
}

fn default_knn_neighbors() -> usize {
    3
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_epochs() -> usize {
    200
}

fn default_batch_size() -> usize {
    16
}

fn default_l2() -> f64 {
    1e-4
}

fn default_expected_score() -> f64 {
    0.6
}

fn default_overfitting_threshold() -> f64 {
    0.05
}

/// Load settings from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (a partial JSON object, e.g. from CLI flags)
/// 2. Environment variables (prefixed with `NETSEC_`, nested keys split on `__`)
/// 3. An explicit settings file, else `<workspace>/netsec.toml`
/// 4. Built-in defaults
pub fn load_settings(
    workspace: Option<&Path>,
    file: Option<&Path>,
    overrides: Option<&serde_json::Value>,
) -> Result<PipelineSettings> {
    let mut figment = Figment::from(Serialized::defaults(PipelineSettings::default()));

    match (file, workspace) {
        (Some(file), _) => {
            figment = figment.merge(Toml::file(file));
        }
        (None, Some(ws)) => {
            let ws_settings = ws.join(SETTINGS_FILE_NAME);
            if ws_settings.exists() {
                figment = figment.merge(Toml::file(&ws_settings));
            }
        }
        (None, None) => {}
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let settings: PipelineSettings = figment.extract().at("config::load_settings")?;
    Ok(match workspace {
        Some(ws) => settings.anchored_at(ws),
        None => settings,
    })
}
