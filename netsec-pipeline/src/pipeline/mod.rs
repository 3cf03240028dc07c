//! Pipeline orchestration: run configuration, artifacts, stage contract.

pub mod artifact;
pub mod config;
pub mod orchestrator;
pub mod stage;

pub use artifact::{
    Artifact, IngestionArtifact, TrainingArtifact, TransformationArtifact, ValidationArtifact,
};
pub use config::{
    IngestionConfig, RootConfig, TrainingConfig, TransformationConfig, ValidationConfig,
};
pub use orchestrator::{PipelineRun, PipelineState, TrainingPipeline};
pub use stage::Stage;
