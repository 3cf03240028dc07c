//! K-nearest-neighbour imputation of missing (`NaN`) feature values.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Fills every `NaN` with the mean of that column over the `k` nearest
/// training rows that have it, by NaN-aware euclidean distance.
///
/// Rows with no usable donor fall back to the training column mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnImputer {
    pub n_neighbors: usize,
    #[serde(with = "nan_matrix")]
    donors: Array2<f64>,
    fallback: Array1<f64>,
}

impl KnnImputer {
    pub fn fit(x: &Array2<f64>, n_neighbors: usize) -> Self {
        let fallback = x
            .axis_iter(Axis(1))
            .map(|col| {
                let present: Vec<f64> = col.iter().copied().filter(|v| !v.is_nan()).collect();
                if present.is_empty() {
                    0.0
                } else {
                    present.iter().sum::<f64>() / present.len() as f64
                }
            })
            .collect();
        Self {
            n_neighbors: n_neighbors.max(1),
            donors: x.clone(),
            fallback,
        }
    }

    pub fn n_features(&self) -> usize {
        self.donors.ncols()
    }

    /// Impute a copy of `x`; rows without missing values are untouched.
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            let missing: Vec<usize> = (0..row.len()).filter(|&c| row[c].is_nan()).collect();
            if missing.is_empty() {
                continue;
            }
            let distances: Vec<Option<f64>> = self
                .donors
                .axis_iter(Axis(0))
                .map(|donor| nan_euclidean(row.view(), donor))
                .collect();

            for &c in &missing {
                let mut candidates: Vec<(f64, usize)> = distances
                    .iter()
                    .enumerate()
                    .filter_map(|(i, d)| d.map(|d| (d, i)))
                    .filter(|&(_, i)| !self.donors[[i, c]].is_nan())
                    .collect();
                candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                candidates.truncate(self.n_neighbors);

                row[c] = if candidates.is_empty() {
                    self.fallback[c]
                } else {
                    candidates.iter().map(|&(_, i)| self.donors[[i, c]]).sum::<f64>()
                        / candidates.len() as f64
                };
            }
        }
        out
    }
}

/// Euclidean distance over coordinates present in both rows, scaled up by
/// `total / present`. `None` when no coordinate is shared.
fn nan_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut present = 0usize;
    for (x, y) in a.iter().zip(b.iter()) {
        if !x.is_nan() && !y.is_nan() {
            sum += (x - y).powi(2);
            present += 1;
        }
    }
    if present == 0 {
        return None;
    }
    Some((sum * a.len() as f64 / present as f64).sqrt())
}

/// JSON has no NaN, so donor cells that are missing travel as `null`.
mod nan_matrix {
    use ndarray::Array2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Repr {
        rows: usize,
        cols: usize,
        data: Vec<Option<f64>>,
    }

    pub fn serialize<S: Serializer>(m: &Array2<f64>, s: S) -> Result<S::Ok, S::Error> {
        Repr {
            rows: m.nrows(),
            cols: m.ncols(),
            data: m.iter().map(|v| (!v.is_nan()).then_some(*v)).collect(),
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Array2<f64>, D::Error> {
        let repr = Repr::deserialize(d)?;
        let data = repr
            .data
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Array2::from_shape_vec((repr.rows, repr.cols), data).map_err(serde::de::Error::custom)
    }
}
