//! The four stage executors, in pipeline order.

pub mod ingestion;
pub mod training;
pub mod transformation;
pub mod validation;

#[cfg(test)]
pub(crate) mod fixtures;

pub use ingestion::DataIngestion;
pub use training::ModelTrainer;
pub use transformation::DataTransformation;
pub use validation::DataValidation;
