//! Transformation: fit the preprocessor on train, produce numeric arrays.

use ndarray::{Array1, Array2, Axis};
use tracing::{Span, debug, info};

use crate::data::source::{DataBatch, as_number, read_csv};
use crate::error::{Fault, Result, ResultExt};
use crate::features::Preprocessor;
use crate::persistence;
use crate::pipeline::artifact::{Artifact, TransformationArtifact, ValidationArtifact};
use crate::pipeline::config::TransformationConfig;
use crate::pipeline::stage::Stage;

pub struct DataTransformation<'a> {
    config: TransformationConfig,
    validation: &'a ValidationArtifact,
}

impl<'a> DataTransformation<'a> {
    pub fn new(config: TransformationConfig, validation: &'a ValidationArtifact) -> Self {
        Self { config, validation }
    }
}

impl Stage for DataTransformation<'_> {
    type Artifact = TransformationArtifact;
    const NAME: &'static str = "transformation";

    fn initiate(self, span: &Span) -> Result<TransformationArtifact> {
        let _enter = span.enter();
        let config = &self.config;
        persistence::create_stage_dir(&config.dir).at("DataTransformation::initiate")?;

        let train_file = self.validation.train_file().at("DataTransformation::initiate")?;
        let test_file = self.validation.test_file().at("DataTransformation::initiate")?;
        let train = read_csv(train_file, config.delimiter).at("DataTransformation::initiate")?;
        let test = read_csv(test_file, config.delimiter).at("DataTransformation::initiate")?;
        let (train_x, train_y) =
            split_target(&train, &config.target_column).at("DataTransformation::initiate")?;
        let (test_x, test_y) =
            split_target(&test, &config.target_column).at("DataTransformation::initiate")?;

        let preprocessor = Preprocessor::fit(&train_x, config.knn_neighbors)
            .at("DataTransformation::initiate")?;
        debug!(
            features = preprocessor.columns.len(),
            neighbours = config.knn_neighbors,
            "Preprocessor fitted on train split"
        );

        let train_arr = with_label(
            preprocessor.transform(&train_x).at("DataTransformation::initiate")?,
            train_y,
        )
        .at("DataTransformation::initiate")?;
        let test_arr = with_label(
            preprocessor.transform(&test_x).at("DataTransformation::initiate")?,
            test_y,
        )
        .at("DataTransformation::initiate")?;

        persistence::atomic_write_json(&config.preprocessor_file, &preprocessor)
            .at("DataTransformation::initiate")?;
        persistence::atomic_write_json(&config.train_file, &train_arr)
            .at("DataTransformation::initiate")?;
        persistence::atomic_write_json(&config.test_file, &test_arr)
            .at("DataTransformation::initiate")?;

        let artifact = TransformationArtifact::new(
            config.preprocessor_file.clone(),
            config.train_file.clone(),
            config.test_file.clone(),
            preprocessor.columns.len(),
        );
        artifact.verify().at("DataTransformation::initiate")?;
        artifact.persist(&config.dir).at("DataTransformation::initiate")?;

        info!(
            features = artifact.feature_count(),
            train_shape = ?train_arr.dim(),
            test_shape = ?test_arr.dim(),
            "Transformation completed"
        );
        Ok(artifact)
    }
}

/// Separate the label column from the features.
///
/// Labels are binary: `-1` is read as `0`; anything other than 0 or 1 after
/// that, including a missing label, is a schema fault.
pub(crate) fn split_target(batch: &DataBatch, target: &str) -> Result<(DataBatch, Array1<f64>)> {
    let Some(idx) = batch.column_index(target) else {
        return Err(Fault::schema(format!("target column '{target}' not found")))
            .at("transformation::split_target");
    };

    let labels = batch
        .column(idx)
        .enumerate()
        .map(|(row, value)| match as_number(value) {
            Some(v) if v == -1.0 || v == 0.0 => Ok(0.0),
            Some(v) if v == 1.0 => Ok(1.0),
            _ => Err(Fault::schema(format!(
                "row {row}: label {value} in '{target}' is not one of -1, 0, 1"
            ))),
        })
        .collect::<std::result::Result<Array1<f64>, _>>()
        .at("transformation::split_target")?;

    let columns = batch
        .columns
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != idx)
        .map(|(_, name)| name.clone())
        .collect();
    let rows = batch
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|&(i, _)| i != idx)
                .map(|(_, v)| v.clone())
                .collect()
        })
        .collect();
    Ok((DataBatch::new(columns, rows), labels))
}

fn with_label(features: Array2<f64>, labels: Array1<f64>) -> Result<Array2<f64>> {
    ndarray::concatenate(Axis(1), &[features.view(), labels.insert_axis(Axis(1)).view()])
        .map_err(|e| Fault::numeric(format!("cannot append label column: {e}")))
        .at("transformation::with_label")
}
