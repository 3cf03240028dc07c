//! Immutable records passed from one stage to the next.
//!
//! Fields are private and the constructors are crate-internal: only the stage
//! that owns an artifact can build one, and nothing can change it afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::error::{Fault, Result, ResultExt};
use crate::persistence;
use crate::pipeline::config::ARTIFACT_FILE_NAME;
use crate::training::ClassificationMetrics;

/// Common behaviour of every stage output.
pub trait Artifact: Serialize + DeserializeOwned {
    /// Every file this artifact points at.
    fn referenced_paths(&self) -> Vec<&Path>;

    /// Check that each referenced path exists and is a readable file.
    fn verify(&self) -> Result<()> {
        for path in self.referenced_paths() {
            if !path.is_file() {
                return Err(Fault::MissingFile(path.to_path_buf())).at("Artifact::verify");
            }
            std::fs::File::open(path).at("Artifact::verify")?;
        }
        Ok(())
    }

    /// Write `artifact.json` into `stage_dir`, returning its path.
    fn persist(&self, stage_dir: &Path) -> Result<PathBuf> {
        let path = stage_dir.join(ARTIFACT_FILE_NAME);
        persistence::atomic_write_json(&path, self).at("Artifact::persist")?;
        Ok(path)
    }

    /// Read the `artifact.json` previously written into `stage_dir`.
    fn load(stage_dir: &Path) -> Result<Self> {
        let path = stage_dir.join(ARTIFACT_FILE_NAME);
        if !path.is_file() {
            return Err(Fault::MissingFile(path)).at("Artifact::load");
        }
        persistence::read_json(&path).at("Artifact::load")
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionArtifact {
    feature_store_file: PathBuf,
    train_file: PathBuf,
    test_file: PathBuf,
    train_rows: usize,
    test_rows: usize,
    train_sha256: String,
    test_sha256: String,
}

impl IngestionArtifact {
    pub(crate) fn new(
        feature_store_file: PathBuf,
        train_file: PathBuf,
        test_file: PathBuf,
        train_rows: usize,
        test_rows: usize,
    ) -> Result<Self> {
        let train_sha256 = persistence::hash_file(&train_file).at("IngestionArtifact::new")?;
        let test_sha256 = persistence::hash_file(&test_file).at("IngestionArtifact::new")?;
        Ok(Self {
            feature_store_file,
            train_file,
            test_file,
            train_rows,
            test_rows,
            train_sha256,
            test_sha256,
        })
    }

    pub fn feature_store_file(&self) -> &Path {
        &self.feature_store_file
    }

    pub fn train_file(&self) -> &Path {
        &self.train_file
    }

    pub fn test_file(&self) -> &Path {
        &self.test_file
    }

    pub fn train_rows(&self) -> usize {
        self.train_rows
    }

    pub fn test_rows(&self) -> usize {
        self.test_rows
    }

    pub fn train_sha256(&self) -> &str {
        &self.train_sha256
    }

    pub fn test_sha256(&self) -> &str {
        &self.test_sha256
    }
}

impl Artifact for IngestionArtifact {
    fn referenced_paths(&self) -> Vec<&Path> {
        vec![
            self.feature_store_file.as_path(),
            self.train_file.as_path(),
            self.test_file.as_path(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Outcome of validation. Exactly one of the valid/invalid pairs is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationArtifact {
    passed: bool,
    valid_train_file: Option<PathBuf>,
    valid_test_file: Option<PathBuf>,
    invalid_train_file: Option<PathBuf>,
    invalid_test_file: Option<PathBuf>,
    drift_report_file: PathBuf,
    failures: Vec<String>,
}

impl ValidationArtifact {
    pub(crate) fn passed(
        train_file: PathBuf,
        test_file: PathBuf,
        drift_report_file: PathBuf,
    ) -> Self {
        Self {
            passed: true,
            valid_train_file: Some(train_file),
            valid_test_file: Some(test_file),
            invalid_train_file: None,
            invalid_test_file: None,
            drift_report_file,
            failures: Vec::new(),
        }
    }

    pub(crate) fn failed(
        train_file: PathBuf,
        test_file: PathBuf,
        drift_report_file: PathBuf,
        failures: Vec<String>,
    ) -> Self {
        Self {
            passed: false,
            valid_train_file: None,
            valid_test_file: None,
            invalid_train_file: Some(train_file),
            invalid_test_file: Some(test_file),
            drift_report_file,
            failures,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.passed
    }

    pub fn valid_train_file(&self) -> Option<&Path> {
        self.valid_train_file.as_deref()
    }

    pub fn valid_test_file(&self) -> Option<&Path> {
        self.valid_test_file.as_deref()
    }

    pub fn invalid_train_file(&self) -> Option<&Path> {
        self.invalid_train_file.as_deref()
    }

    pub fn invalid_test_file(&self) -> Option<&Path> {
        self.invalid_test_file.as_deref()
    }

    /// The persisted train split, wherever validation put it.
    pub fn train_file(&self) -> Result<&Path> {
        self.valid_train_file()
            .or(self.invalid_train_file())
            .ok_or_else(|| Fault::invalid_state("validation artifact has no train file"))
            .at("ValidationArtifact::train_file")
    }

    /// The persisted test split, wherever validation put it.
    pub fn test_file(&self) -> Result<&Path> {
        self.valid_test_file()
            .or(self.invalid_test_file())
            .ok_or_else(|| Fault::invalid_state("validation artifact has no test file"))
            .at("ValidationArtifact::test_file")
    }

    pub fn drift_report_file(&self) -> &Path {
        &self.drift_report_file
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

impl Artifact for ValidationArtifact {
    fn referenced_paths(&self) -> Vec<&Path> {
        [
            self.valid_train_file.as_deref(),
            self.valid_test_file.as_deref(),
            self.invalid_train_file.as_deref(),
            self.invalid_test_file.as_deref(),
            Some(self.drift_report_file.as_path()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Transformation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationArtifact {
    preprocessor_file: PathBuf,
    train_file: PathBuf,
    test_file: PathBuf,
    feature_count: usize,
}

impl TransformationArtifact {
    pub(crate) fn new(
        preprocessor_file: PathBuf,
        train_file: PathBuf,
        test_file: PathBuf,
        feature_count: usize,
    ) -> Self {
        Self {
            preprocessor_file,
            train_file,
            test_file,
            feature_count,
        }
    }

    pub fn preprocessor_file(&self) -> &Path {
        &self.preprocessor_file
    }

    /// Numeric train array; the label is the last column.
    pub fn train_file(&self) -> &Path {
        &self.train_file
    }

    /// Numeric test array; the label is the last column.
    pub fn test_file(&self) -> &Path {
        &self.test_file
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }
}

impl Artifact for TransformationArtifact {
    fn referenced_paths(&self) -> Vec<&Path> {
        vec![
            self.preprocessor_file.as_path(),
            self.train_file.as_path(),
            self.test_file.as_path(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingArtifact {
    model_file: PathBuf,
    train_metrics: ClassificationMetrics,
    test_metrics: ClassificationMetrics,
    final_loss: Option<f64>,
}

impl TrainingArtifact {
    pub(crate) fn new(
        model_file: PathBuf,
        train_metrics: ClassificationMetrics,
        test_metrics: ClassificationMetrics,
        final_loss: Option<f64>,
    ) -> Self {
        Self {
            model_file,
            train_metrics,
            test_metrics,
            final_loss,
        }
    }

    pub fn model_file(&self) -> &Path {
        &self.model_file
    }

    pub fn train_metrics(&self) -> &ClassificationMetrics {
        &self.train_metrics
    }

    pub fn test_metrics(&self) -> &ClassificationMetrics {
        &self.test_metrics
    }

    /// Training log loss after the last epoch.
    pub fn final_loss(&self) -> Option<f64> {
        self.final_loss
    }
}

impl Artifact for TrainingArtifact {
    fn referenced_paths(&self) -> Vec<&Path> {
        vec![self.model_file.as_path()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_verify_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("model.json");
        let metrics = ClassificationMetrics::compute(&[1.0], &[1.0]);
        let artifact = TrainingArtifact::new(model.clone(), metrics.clone(), metrics, None);

        let err = artifact.verify().unwrap_err();
        assert!(matches!(err.fault(), Fault::MissingFile(p) if *p == model));

        std::fs::write(&model, "{}").unwrap();
        artifact.verify().unwrap();
    }

    #[test]
    fn test_persist_and_load() {
        let dir = TempDir::new().unwrap();
        let train = dir.path().join("train.csv");
        let test = dir.path().join("test.csv");
        let report = dir.path().join("report.yaml");
        for p in [&train, &test, &report] {
            std::fs::write(p, "a\n1\n").unwrap();
        }
        let artifact =
            ValidationArtifact::failed(train.clone(), test, report, vec!["drift".into()]);
        let written = artifact.persist(dir.path()).unwrap();
        assert_eq!(written, dir.path().join(ARTIFACT_FILE_NAME));

        let loaded = ValidationArtifact::load(dir.path()).unwrap();
        assert_eq!(loaded, artifact);
        assert!(!loaded.is_passed());
        assert_eq!(loaded.train_file().unwrap(), train.as_path());
        assert_eq!(loaded.valid_train_file(), None);
        assert_eq!(loaded.referenced_paths().len(), 3);
    }

    #[test]
    fn test_ingestion_digests_match_files() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw.csv");
        let train = dir.path().join("train.csv");
        let test = dir.path().join("test.csv");
        std::fs::write(&raw, "a\n1\n2\n").unwrap();
        std::fs::write(&train, "a\n1\n").unwrap();
        std::fs::write(&test, "a\n2\n").unwrap();
        let artifact = IngestionArtifact::new(raw, train, test, 1, 1).unwrap();
        assert_eq!(artifact.train_sha256(), persistence::hash_bytes(b"a\n1\n"));
        assert_ne!(artifact.train_sha256(), artifact.test_sha256());
        artifact.verify().unwrap();
    }

    #[test]
    fn test_corrupt_artifact_file_is_a_serde_fault() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(ARTIFACT_FILE_NAME), "{\"model_file\": 3").unwrap();

        let err = TrainingArtifact::load(dir.path()).unwrap_err();
        assert!(matches!(err.fault(), Fault::Serde(_)), "{err}");
        assert_eq!(err.trail()[0].operation, "Artifact::load");
    }
}
