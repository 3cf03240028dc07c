//! Feature preprocessing: encoding, imputation, scaling.

pub mod encode;
pub mod impute;
pub mod preprocessor;
pub mod scale;

pub use encode::{ColumnEncoding, OrdinalEncoder};
pub use impute::KnnImputer;
pub use preprocessor::{FeatureColumn, Preprocessor};
pub use scale::StandardScaler;
