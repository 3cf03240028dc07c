//! Training: fit the classifier, score it, persist the combined model.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis, s};
use tracing::{Span, info};

use crate::error::{Fault, Result, ResultExt};
use crate::features::Preprocessor;
use crate::persistence;
use crate::pipeline::artifact::{Artifact, TrainingArtifact, TransformationArtifact};
use crate::pipeline::config::TrainingConfig;
use crate::pipeline::stage::Stage;
use crate::training::{ClassificationMetrics, LogisticRegression, NetworkModel};

pub struct ModelTrainer<'a> {
    config: TrainingConfig,
    transformation: &'a TransformationArtifact,
}

impl<'a> ModelTrainer<'a> {
    pub fn new(config: TrainingConfig, transformation: &'a TransformationArtifact) -> Self {
        Self {
            config,
            transformation,
        }
    }
}

impl Stage for ModelTrainer<'_> {
    type Artifact = TrainingArtifact;
    const NAME: &'static str = "training";

    /// Fits on the train array only; the test array is read afterwards, for
    /// scoring.
    fn initiate(self, span: &Span) -> Result<TrainingArtifact> {
        let _enter = span.enter();
        let config = &self.config;
        persistence::create_stage_dir(&config.dir).at("ModelTrainer::initiate")?;

        let train: Array2<f64> =
            persistence::read_json(self.transformation.train_file()).at("ModelTrainer::initiate")?;
        let (train_x, train_y) = split_label(&train).at("ModelTrainer::initiate")?;
        let (model, history) =
            LogisticRegression::fit(train_x, train_y, &config.params, config.sgd_seed)
                .at("ModelTrainer::initiate")?;
        info!(
            epochs = history.epochs_completed,
            final_loss = history.final_loss(),
            "Classifier fitted"
        );

        let test: Array2<f64> =
            persistence::read_json(self.transformation.test_file()).at("ModelTrainer::initiate")?;
        let (test_x, test_y) = split_label(&test).at("ModelTrainer::initiate")?;
        let train_metrics = ClassificationMetrics::compute(&train_y, &model.predict(train_x));
        let test_metrics = ClassificationMetrics::compute(&test_y, &model.predict(test_x));
        info!(
            train_f1 = train_metrics.f1_score,
            test_f1 = test_metrics.f1_score,
            test_accuracy = test_metrics.accuracy,
            "Model scored"
        );
        check_quality(config, &train_metrics, &test_metrics).at("ModelTrainer::initiate")?;

        let preprocessor: Preprocessor =
            persistence::read_json(self.transformation.preprocessor_file())
                .at("ModelTrainer::initiate")?;
        NetworkModel::new(preprocessor, model)
            .and_then(|m| m.save(&config.model_file))
            .at("ModelTrainer::initiate")?;

        let artifact = TrainingArtifact::new(
            config.model_file.clone(),
            train_metrics,
            test_metrics,
            history.final_loss(),
        );
        artifact.verify().at("ModelTrainer::initiate")?;
        artifact.persist(&config.dir).at("ModelTrainer::initiate")?;

        info!(model = %artifact.model_file().display(), "Training completed");
        Ok(artifact)
    }
}

/// Features are every column but the last; the last is the label.
fn split_label(arr: &Array2<f64>) -> Result<(ArrayView2<'_, f64>, ArrayView1<'_, f64>)> {
    if arr.ncols() < 2 {
        return Err(Fault::numeric(format!(
            "expected features plus a label column, found {} columns",
            arr.ncols()
        )))
        .at("training::split_label");
    }
    let last = arr.ncols() - 1;
    Ok((arr.slice(s![.., ..last]), arr.index_axis(Axis(1), last)))
}

fn check_quality(
    config: &TrainingConfig,
    train: &ClassificationMetrics,
    test: &ClassificationMetrics,
) -> std::result::Result<(), Fault> {
    if train.f1_score < config.expected_score {
        return Err(Fault::ModelQuality(format!(
            "train f1 {:.4} is below the expected score {:.4}",
            train.f1_score, config.expected_score
        )));
    }
    let gap = (train.f1_score - test.f1_score).abs();
    if gap > config.overfitting_threshold {
        return Err(Fault::ModelQuality(format!(
            "train/test f1 gap {gap:.4} exceeds {:.4}",
            config.overfitting_threshold
        )));
    }
    Ok(())
}
