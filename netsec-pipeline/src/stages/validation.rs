//! Validation: schema conformance and train/test drift screening.

use tracing::{Span, info, warn};

use crate::data::drift::detect_drift;
use crate::data::schema::SchemaDefinition;
use crate::data::source::{read_csv, write_csv};
use crate::error::{Result, ResultExt};
use crate::persistence;
use crate::pipeline::artifact::{Artifact, IngestionArtifact, ValidationArtifact};
use crate::pipeline::config::ValidationConfig;
use crate::pipeline::stage::Stage;

pub struct DataValidation<'a> {
    config: ValidationConfig,
    ingestion: &'a IngestionArtifact,
}

impl<'a> DataValidation<'a> {
    pub fn new(config: ValidationConfig, ingestion: &'a IngestionArtifact) -> Self {
        Self { config, ingestion }
    }
}

impl Stage for DataValidation<'_> {
    type Artifact = ValidationArtifact;
    const NAME: &'static str = "validation";

    /// A batch that fails validation still yields an artifact; only I/O and
    /// parse problems are errors here.
    fn initiate(self, span: &Span) -> Result<ValidationArtifact> {
        let _enter = span.enter();
        let config = &self.config;
        persistence::create_stage_dir(&config.dir).at("DataValidation::initiate")?;

        let schema = SchemaDefinition::load(&config.schema_file).at("DataValidation::initiate")?;
        let train =
            read_csv(self.ingestion.train_file(), config.delimiter).at("DataValidation::initiate")?;
        let test =
            read_csv(self.ingestion.test_file(), config.delimiter).at("DataValidation::initiate")?;

        let mut failures = schema.violations(&train, "train");
        failures.extend(schema.violations(&test, "test"));

        let report = detect_drift(&train, &test, &train.columns, config.drift_threshold);
        persistence::atomic_write_yaml(&config.drift_report_file, &report)
            .at("DataValidation::initiate")?;
        for (name, drift) in report.columns.iter().filter(|(_, d)| d.drift_status) {
            failures.push(format!(
                "drift detected in column '{name}' (p = {:.4})",
                drift.p_value
            ));
        }

        let artifact = if failures.is_empty() {
            write_csv(&config.valid_train_file, &train, config.delimiter)
                .at("DataValidation::initiate")?;
            write_csv(&config.valid_test_file, &test, config.delimiter)
                .at("DataValidation::initiate")?;
            ValidationArtifact::passed(
                config.valid_train_file.clone(),
                config.valid_test_file.clone(),
                config.drift_report_file.clone(),
            )
        } else {
            for reason in &failures {
                warn!(reason = %reason, "Validation check failed");
            }
            write_csv(&config.invalid_train_file, &train, config.delimiter)
                .at("DataValidation::initiate")?;
            write_csv(&config.invalid_test_file, &test, config.delimiter)
                .at("DataValidation::initiate")?;
            ValidationArtifact::failed(
                config.invalid_train_file.clone(),
                config.invalid_test_file.clone(),
                config.drift_report_file.clone(),
                failures,
            )
        };
        artifact.verify().at("DataValidation::initiate")?;
        artifact.persist(&config.dir).at("DataValidation::initiate")?;

        info!(
            passed = artifact.is_passed(),
            failures = artifact.failures().len(),
            drifted = report.drifted_columns().count(),
            "Validation completed"
        );
        Ok(artifact)
    }
}
