//! Training infrastructure: classifier, metrics, seeds, persisted estimator.

pub mod estimator;
pub mod logistic;
pub mod metrics;
pub mod reproducibility;

pub use estimator::NetworkModel;
pub use logistic::{LogisticRegression, LogisticRegressionParams};
pub use metrics::{ClassificationMetrics, TrainingMetrics};
pub use reproducibility::SeedManager;
