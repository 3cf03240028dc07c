//! # netsec-pipeline - staged training pipeline for the network-security classifier
//!
//! A run passes typed artifacts through four synchronous stages:
//!
//! ```text
//! Ingestion -> Validation -> Transformation -> Training
//! ```
//!
//! Each stage is built from an immutable config derived from the run's
//! [`RootConfig`] and a reference to the previous stage's artifact, and is
//! consumed by [`Stage::initiate`]. [`TrainingPipeline`] drives the sequence and
//! tracks its [`PipelineState`]. Every failure surfaces as a [`PipelineError`]
//! carrying the original fault and one breadcrumb per boundary it crossed.

// Foundation
pub mod config;
pub mod error;
pub mod persistence;

// Data engineering
pub mod data;
pub mod features;

// Models
pub mod training;

// Orchestration
pub mod pipeline;
pub mod stages;

// Re-exports
pub use config::{PipelineSettings, ValidationPolicy, load_settings};
pub use error::{Fault, PipelineError, Result, ResultExt};
pub use pipeline::{
    Artifact, IngestionArtifact, PipelineRun, PipelineState, RootConfig, Stage, TrainingArtifact,
    TrainingPipeline, TransformationArtifact, ValidationArtifact,
};
pub use training::NetworkModel;
