//! The reusable preprocessing object fitted by the transformation stage.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::source::DataBatch;
use crate::error::{Fault, Result, ResultExt};
use crate::features::encode::ColumnEncoding;
use crate::features::impute::KnnImputer;
use crate::features::scale::StandardScaler;

/// A feature column and how it is encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub encoding: ColumnEncoding,
}

/// Encode -> KNN impute -> standard scale, fitted on the training split only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub columns: Vec<FeatureColumn>,
    imputer: KnnImputer,
    scaler: StandardScaler,
}

impl Preprocessor {
    /// Fit on a features-only batch (the label column must already be removed).
    pub fn fit(train: &DataBatch, n_neighbors: usize) -> Result<Self> {
        if train.column_count() == 0 {
            return Err(Fault::schema("no feature columns to fit on")).at("Preprocessor::fit");
        }
        if train.row_count() == 0 {
            return Err(Fault::dataset("cannot fit on an empty training split"))
                .at("Preprocessor::fit");
        }

        let columns: Vec<FeatureColumn> = train
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| FeatureColumn {
                name: name.clone(),
                encoding: ColumnEncoding::infer(train.column(i)),
            })
            .collect();

        let encoded = encode(&columns, train).at("Preprocessor::fit")?;
        let imputer = KnnImputer::fit(&encoded, n_neighbors);
        let scaler = StandardScaler::fit(&imputer.transform(&encoded));
        Ok(Self {
            columns,
            imputer,
            scaler,
        })
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Map a batch to a dense feature matrix with no missing values.
    ///
    /// Pure: the same input always gives the same output. Unseen categories and
    /// unparseable numbers are imputed rather than rejected; only a missing
    /// feature column is an error. Extra columns are ignored.
    pub fn transform(&self, batch: &DataBatch) -> Result<Array2<f64>> {
        let encoded = encode(&self.columns, batch).at("Preprocessor::transform")?;
        let imputed = self.imputer.transform(&encoded);
        let scaled = self.scaler.transform(&imputed);
        if scaled.iter().any(|v| !v.is_finite()) {
            return Err(Fault::numeric("non-finite value after preprocessing"))
                .at("Preprocessor::transform");
        }
        Ok(scaled)
    }
}

fn encode(columns: &[FeatureColumn], batch: &DataBatch) -> Result<Array2<f64>> {
    let positions: Vec<usize> = columns
        .iter()
        .map(|col| {
            batch
                .column_index(&col.name)
                .ok_or_else(|| Fault::schema(format!("missing feature column '{}'", col.name)))
        })
        .collect::<std::result::Result<_, _>>()
        .at("preprocessor::encode")?;

    let mut out = Array2::<f64>::zeros((batch.row_count(), columns.len()));
    for (r, row) in batch.rows.iter().enumerate() {
        for (c, (col, &pos)) in columns.iter().zip(&positions).enumerate() {
            out[[r, c]] = row
                .get(pos)
                .map_or(f64::NAN, |value| col.encoding.encode(value));
        }
    }
    Ok(out)
}
