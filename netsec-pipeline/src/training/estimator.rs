//! The persisted model: preprocessing plus classifier, usable on raw records.

use std::path::Path;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::data::source::DataBatch;
use crate::error::{Fault, Result, ResultExt};
use crate::features::Preprocessor;
use crate::persistence;
use crate::training::logistic::LogisticRegression;

/// Wraps the fitted preprocessor and classifier so raw records can be scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkModel {
    pub preprocessor: Preprocessor,
    pub model: LogisticRegression,
}

impl NetworkModel {
    pub fn new(preprocessor: Preprocessor, model: LogisticRegression) -> Result<Self> {
        let features = preprocessor.columns.len();
        if features != model.n_features() {
            return Err(Fault::invalid_state(format!(
                "preprocessor yields {features} features, model expects {}",
                model.n_features()
            )))
            .at("NetworkModel::new");
        }
        Ok(Self {
            preprocessor,
            model,
        })
    }

    /// One 0/1 label per record in `batch`.
    pub fn predict(&self, batch: &DataBatch) -> Result<Vec<u8>> {
        let x = self.preprocessor.transform(batch).at("NetworkModel::predict")?;
        Ok(self.predict_features(x.view()))
    }

    /// One 0/1 label per row of an already preprocessed matrix.
    pub fn predict_features(&self, x: ArrayView2<f64>) -> Vec<u8> {
        self.model.predict(x).iter().map(|&p| p as u8).collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        persistence::atomic_write_json(path, self).at("NetworkModel::save")
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Fault::MissingFile(path.to_path_buf())).at("NetworkModel::load");
        }
        persistence::read_json(path).at("NetworkModel::load")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::logistic::LogisticRegressionParams;
    use ndarray::Array1;
    use serde_json::json;

    fn fitted() -> (NetworkModel, DataBatch) {
        let batch = DataBatch::new(
            vec!["a".into(), "b".into()],
            (0..20)
                .map(|i| {
                    let s = if i % 2 == 0 { 1.0 } else { -1.0 };
                    vec![json!(s * (1.0 + i as f64 / 10.0)), json!(s)]
                })
                .collect(),
        );
        let pre = Preprocessor::fit(&batch, 3).unwrap();
        let x = pre.transform(&batch).unwrap();
        let y: Array1<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
        let (model, _) =
            LogisticRegression::fit(x.view(), y.view(), &LogisticRegressionParams::default(), 3)
                .unwrap();
        (NetworkModel::new(pre, model).unwrap(), batch)
    }

    #[test]
    fn test_predicts_one_label_per_record() {
        let (model, batch) = fitted();
        let labels = model.predict(&batch).unwrap();
        assert_eq!(labels.len(), batch.row_count());
        assert_eq!(labels[0], 1);
        assert_eq!(labels[1], 0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let (model, batch) = fitted();
        model.save(&path).unwrap();
        let loaded = NetworkModel::load(&path).unwrap();
        assert_eq!(loaded.predict(&batch).unwrap(), model.predict(&batch).unwrap());
    }

    #[test]
    fn test_feature_count_mismatch_is_rejected() {
        let (model, _) = fitted();
        let narrow = LogisticRegression {
            weights: Array1::zeros(1),
            bias: 0.0,
        };
        assert!(NetworkModel::new(model.preprocessor, narrow).is_err());
    }

    #[test]
    fn test_load_missing_model() {
        let err = NetworkModel::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err.fault(), Fault::MissingFile(_)));
    }
}
