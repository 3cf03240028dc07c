//! Sequences the four stages for one run.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{Span, error, info, info_span, warn};

use crate::config::{PipelineSettings, ValidationPolicy};
use crate::data::source::DataSource;
use crate::error::{Fault, Result, ResultExt};
use crate::pipeline::artifact::{
    IngestionArtifact, TrainingArtifact, TransformationArtifact, ValidationArtifact,
};
use crate::pipeline::config::{
    IngestionConfig, RootConfig, TrainingConfig, TransformationConfig, ValidationConfig,
};
use crate::pipeline::stage::Stage;
use crate::stages::{DataIngestion, DataTransformation, DataValidation, ModelTrainer};

/// Where a run currently is. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Ingesting,
    Validating,
    Transforming,
    Training,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Ingesting => write!(f, "ingesting"),
            PipelineState::Validating => write!(f, "validating"),
            PipelineState::Transforming => write!(f, "transforming"),
            PipelineState::Training => write!(f, "training"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Failed => write!(f, "failed"),
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub root: RootConfig,
    pub ingestion: IngestionArtifact,
    pub validation: ValidationArtifact,
    pub transformation: TransformationArtifact,
    pub training: TrainingArtifact,
}

/// One training run over one data source.
///
/// The run directory is created when the pipeline is built; stage configs and
/// executors are built only when their stage is reached.
pub struct TrainingPipeline {
    root: RootConfig,
    source: Box<dyn DataSource>,
    state: PipelineState,
}

impl TrainingPipeline {
    /// Bind `settings` to the current time and create the run directory.
    pub fn new(settings: PipelineSettings, source: impl DataSource + 'static) -> Result<Self> {
        Self::with_root(RootConfig::new(settings), source).at("TrainingPipeline::new")
    }

    pub fn with_root(root: RootConfig, source: impl DataSource + 'static) -> Result<Self> {
        std::fs::create_dir_all(root.artifact_dir()).at("TrainingPipeline::with_root")?;
        info!(
            run_id = root.run_id(),
            artifact_dir = %root.artifact_dir().display(),
            "Run directory created"
        );
        Ok(Self {
            root,
            source: Box::new(source),
            state: PipelineState::Idle,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn root(&self) -> &RootConfig {
        &self.root
    }

    /// Run all four stages. A pipeline runs at most once.
    pub fn run(&mut self) -> Result<PipelineRun> {
        if self.state != PipelineState::Idle {
            return Err(Fault::invalid_state(format!(
                "pipeline already ran (state: {})",
                self.state
            )))
            .at("TrainingPipeline::run");
        }

        let span = info_span!(
            "training_pipeline",
            pipeline = %self.root.settings().pipeline_name,
            run_id = %self.root.run_id()
        );
        let _enter = span.enter();
        info!(policy = %self.root.policy(), "Training pipeline started");

        match self.execute(&span) {
            Ok(run) => {
                self.state = PipelineState::Done;
                info!(
                    test_f1 = run.training.test_metrics().f1_score,
                    model = %run.training.model_file().display(),
                    "Training pipeline finished"
                );
                Ok(run)
            }
            Err(err) => {
                let failed_in = self.state;
                self.state = PipelineState::Failed;
                error!(stage = %failed_in, error = %err, "Training pipeline failed");
                Err(err.annotate("TrainingPipeline::run"))
            }
        }
    }

    fn execute(&mut self, span: &Span) -> Result<PipelineRun> {
        self.state = PipelineState::Ingesting;
        let ingestion = {
            let config = IngestionConfig::from_root(&self.root)?;
            run_stage(DataIngestion::new(config, self.source.as_ref()), span)?
        };

        self.state = PipelineState::Validating;
        let validation = {
            let config = ValidationConfig::from_root(&self.root)?;
            run_stage(DataValidation::new(config, &ingestion), span)?
        };
        if !validation.is_passed() {
            match self.root.policy() {
                ValidationPolicy::Halt => {
                    return Err(Fault::ValidationRejected(validation.failures().join("; ")))
                        .at("TrainingPipeline::execute");
                }
                ValidationPolicy::Record => {
                    warn!(
                        failures = validation.failures().len(),
                        "Validation failed; continuing under the record policy"
                    );
                }
            }
        }

        self.state = PipelineState::Transforming;
        let transformation = {
            let config = TransformationConfig::from_root(&self.root)?;
            run_stage(DataTransformation::new(config, &validation), span)?
        };

        self.state = PipelineState::Training;
        let training = {
            let config = TrainingConfig::from_root(&self.root)?;
            run_stage(ModelTrainer::new(config, &transformation), span)?
        };

        Ok(PipelineRun {
            root: self.root.clone(),
            ingestion,
            validation,
            transformation,
            training,
        })
    }
}

fn run_stage<S: Stage>(stage: S, parent: &Span) -> Result<S::Artifact> {
    let span = info_span!(parent: parent, "stage", name = S::NAME);
    span.in_scope(|| info!("Stage started"));
    let artifact = stage.initiate(&span)?;
    span.in_scope(|| info!("Stage completed"));
    Ok(artifact)
}
