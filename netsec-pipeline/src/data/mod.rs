//! Data engineering: sources, schema, partitioning, drift screening.

pub mod drift;
pub mod schema;
pub mod source;
pub mod split;

pub use drift::{ColumnDrift, DriftReport, KsResult, detect_drift, ks_2samp};
pub use schema::{ColumnSchema, ColumnType, SchemaDefinition};
pub use source::{CsvSource, DataBatch, DataSource, DataSourceInfo, InMemorySource, read_csv, write_csv};
pub use split::{SplitIndices, train_test_split};
