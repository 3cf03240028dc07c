//! Root and per-stage configuration for one pipeline run.
//!
//! A [`RootConfig`] is created once per run and fixes the run directory. Every
//! stage configuration is derived from it by `from_root`, which only computes
//! paths and copies thresholds: it never touches the filesystem.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::{PipelineSettings, ValidationPolicy};
use crate::error::{Fault, Result, ResultExt};
use crate::training::{LogisticRegressionParams, SeedManager};

/// Timestamp layout used for run identifiers.
pub const RUN_ID_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

/// Name of the persisted artifact record inside each stage directory.
pub const ARTIFACT_FILE_NAME: &str = "artifact.json";

pub const INGESTION_DIR_NAME: &str = "ingestion";
pub const FEATURE_STORE_FILE: &str = "feature_store/raw.csv";
pub const INGESTED_TRAIN_FILE: &str = "ingested/train.csv";
pub const INGESTED_TEST_FILE: &str = "ingested/test.csv";

pub const VALIDATION_DIR_NAME: &str = "validation";
pub const VALID_DIR_NAME: &str = "validated";
pub const INVALID_DIR_NAME: &str = "invalid";
pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const TEST_FILE_NAME: &str = "test.csv";
pub const DRIFT_REPORT_FILE: &str = "drift_report/report.yaml";

pub const TRANSFORMATION_DIR_NAME: &str = "transformation";
pub const PREPROCESSOR_FILE: &str = "transformed_object/preprocessor.json";
pub const TRANSFORMED_TRAIN_FILE: &str = "transformed/train.json";
pub const TRANSFORMED_TEST_FILE: &str = "transformed/test.json";

pub const MODEL_DIR_NAME: &str = "model";
pub const MODEL_FILE: &str = "trained_model/model.json";

/// Component names fed to [`SeedManager::seed_for`].
pub const SPLIT_SEED_COMPONENT: &str = "ingestion.split";
pub const SGD_SEED_COMPONENT: &str = "training.sgd";

/// The single source of truth for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    run_id: String,
    artifact_dir: PathBuf,
    settings: PipelineSettings,
}

impl RootConfig {
    /// Bind the settings to the current local time.
    pub fn new(settings: PipelineSettings) -> Self {
        Self::at(settings, chrono::Local::now().naive_local())
    }

    /// Bind the settings to a given instant.
    pub fn at(settings: PipelineSettings, instant: NaiveDateTime) -> Self {
        let run_id = instant.format(RUN_ID_FORMAT).to_string();
        let artifact_dir = settings.artifact_root.join(&run_id);
        Self {
            run_id,
            artifact_dir,
            settings,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// `<artifact_root>/<run_id>`
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.settings.validation.policy
    }

    pub fn seeds(&self) -> SeedManager {
        SeedManager::new(self.settings.seed)
    }

    fn stage_dir(&self, name: &str) -> PathBuf {
        self.artifact_dir.join(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestionConfig {
    pub dir: PathBuf,
    pub feature_store_file: PathBuf,
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    pub test_ratio: f64,
    pub delimiter: char,
    pub split_seed: u64,
}

impl IngestionConfig {
    pub fn from_root(root: &RootConfig) -> Result<Self> {
        let settings = &root.settings().ingestion;
        check_open_unit("ingestion.test_ratio", settings.test_ratio)
            .at("IngestionConfig::from_root")?;
        let dir = root.stage_dir(INGESTION_DIR_NAME);
        Ok(Self {
            feature_store_file: dir.join(FEATURE_STORE_FILE),
            train_file: dir.join(INGESTED_TRAIN_FILE),
            test_file: dir.join(INGESTED_TEST_FILE),
            test_ratio: settings.test_ratio,
            delimiter: settings.delimiter,
            split_seed: root.seeds().seed_for(SPLIT_SEED_COMPONENT),
            dir,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    pub dir: PathBuf,
    pub schema_file: PathBuf,
    pub valid_train_file: PathBuf,
    pub valid_test_file: PathBuf,
    pub invalid_train_file: PathBuf,
    pub invalid_test_file: PathBuf,
    pub drift_report_file: PathBuf,
    pub drift_threshold: f64,
    pub delimiter: char,
}

impl ValidationConfig {
    pub fn from_root(root: &RootConfig) -> Result<Self> {
        let settings = &root.settings().validation;
        check_open_unit("validation.drift_threshold", settings.drift_threshold)
            .at("ValidationConfig::from_root")?;
        let dir = root.stage_dir(VALIDATION_DIR_NAME);
        let valid = dir.join(VALID_DIR_NAME);
        let invalid = dir.join(INVALID_DIR_NAME);
        Ok(Self {
            schema_file: settings.schema_file.clone(),
            valid_train_file: valid.join(TRAIN_FILE_NAME),
            valid_test_file: valid.join(TEST_FILE_NAME),
            invalid_train_file: invalid.join(TRAIN_FILE_NAME),
            invalid_test_file: invalid.join(TEST_FILE_NAME),
            drift_report_file: dir.join(DRIFT_REPORT_FILE),
            drift_threshold: settings.drift_threshold,
            delimiter: root.settings().ingestion.delimiter,
            dir,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformationConfig {
    pub dir: PathBuf,
    pub preprocessor_file: PathBuf,
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    pub target_column: String,
    pub knn_neighbors: usize,
    pub delimiter: char,
}

impl TransformationConfig {
    pub fn from_root(root: &RootConfig) -> Result<Self> {
        let settings = &root.settings().transformation;
        if settings.knn_neighbors == 0 {
            return Err(Fault::invalid_setting(
                "transformation.knn_neighbors must be at least 1",
            ))
            .at("TransformationConfig::from_root");
        }
        let dir = root.stage_dir(TRANSFORMATION_DIR_NAME);
        Ok(Self {
            preprocessor_file: dir.join(PREPROCESSOR_FILE),
            train_file: dir.join(TRANSFORMED_TRAIN_FILE),
            test_file: dir.join(TRANSFORMED_TEST_FILE),
            target_column: settings.target_column.clone(),
            knn_neighbors: settings.knn_neighbors,
            delimiter: root.settings().ingestion.delimiter,
            dir,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub dir: PathBuf,
    pub model_file: PathBuf,
    pub params: LogisticRegressionParams,
    pub sgd_seed: u64,
    pub expected_score: f64,
    pub overfitting_threshold: f64,
}

impl TrainingConfig {
    pub fn from_root(root: &RootConfig) -> Result<Self> {
        let settings = &root.settings().training;
        if settings.batch_size == 0 || settings.epochs == 0 || !(settings.learning_rate > 0.0) {
            return Err(Fault::invalid_setting(
                "training requires positive learning_rate, epochs and batch_size",
            ))
            .at("TrainingConfig::from_root");
        }
        let dir = root.stage_dir(MODEL_DIR_NAME);
        Ok(Self {
            model_file: dir.join(MODEL_FILE),
            params: LogisticRegressionParams {
                learning_rate: settings.learning_rate,
                epochs: settings.epochs,
                batch_size: settings.batch_size,
                l2: settings.l2,
            },
            sgd_seed: root.seeds().seed_for(SGD_SEED_COMPONENT),
            expected_score: settings.expected_score,
            overfitting_threshold: settings.overfitting_threshold,
            dir,
        })
    }
}

fn check_open_unit(key: &str, value: f64) -> std::result::Result<(), Fault> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(Fault::invalid_setting(format!(
            "{key} must be within (0, 1), got {value}"
        )))
    }
}
