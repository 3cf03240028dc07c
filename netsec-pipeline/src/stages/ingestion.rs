//! Ingestion: load the source table, persist it, split it.

use tracing::{Span, info};

use crate::data::source::{DataSource, write_csv};
use crate::data::split::train_test_split;
use crate::error::{Fault, Result, ResultExt};
use crate::persistence;
use crate::pipeline::artifact::{Artifact, IngestionArtifact};
use crate::pipeline::config::IngestionConfig;
use crate::pipeline::stage::Stage;

pub struct DataIngestion<'a> {
    config: IngestionConfig,
    source: &'a dyn DataSource,
}

impl<'a> DataIngestion<'a> {
    pub fn new(config: IngestionConfig, source: &'a dyn DataSource) -> Self {
        Self { config, source }
    }
}

impl Stage for DataIngestion<'_> {
    type Artifact = IngestionArtifact;
    const NAME: &'static str = "ingestion";

    fn initiate(self, span: &Span) -> Result<IngestionArtifact> {
        let _enter = span.enter();
        let config = &self.config;
        persistence::create_stage_dir(&config.dir).at("DataIngestion::initiate")?;

        let info = self.source.source_info();
        let batch = self.source.load().at("DataIngestion::initiate")?;
        info!(
            source_type = %info.source_type,
            location = %info.location,
            accessed_at = %info.accessed_at,
            rows = batch.row_count(),
            columns = batch.column_count(),
            "Source loaded"
        );
        if batch.column_count() == 0 {
            return Err(Fault::dataset("source has no columns")).at("DataIngestion::initiate");
        }

        write_csv(&config.feature_store_file, &batch, config.delimiter)
            .at("DataIngestion::initiate")?;

        let split = train_test_split(batch.row_count(), config.test_ratio, config.split_seed)
            .at("DataIngestion::initiate")?;
        let train = batch.select_rows(&split.train);
        let test = batch.select_rows(&split.test);
        write_csv(&config.train_file, &train, config.delimiter).at("DataIngestion::initiate")?;
        write_csv(&config.test_file, &test, config.delimiter).at("DataIngestion::initiate")?;

        let artifact = IngestionArtifact::new(
            config.feature_store_file.clone(),
            config.train_file.clone(),
            config.test_file.clone(),
            train.row_count(),
            test.row_count(),
        )
        .at("DataIngestion::initiate")?;
        artifact.verify().at("DataIngestion::initiate")?;
        artifact.persist(&config.dir).at("DataIngestion::initiate")?;

        info!(
            train_rows = artifact.train_rows(),
            test_rows = artifact.test_rows(),
            "Ingestion completed"
        );
        Ok(artifact)
    }
}
