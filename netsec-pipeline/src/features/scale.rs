//! Standard (z-score) scaling.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    /// Population standard deviation; constant columns use 1.0.
    pub scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mean = x.sum_axis(Axis(0)) / n;
        let scale = x
            .axis_iter(Axis(1))
            .zip(mean.iter())
            .map(|(col, m)| {
                let var = col.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();
        Self { mean, scale }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_scaled_train_has_zero_mean_unit_variance() {
        let x = array![[1.0, 5.0], [3.0, 5.0], [5.0, 5.0]];
        let scaler = StandardScaler::fit(&x);
        let z = scaler.transform(&x);
        let mean = z.sum_axis(Axis(0)) / 3.0;
        assert!(mean.iter().all(|m| m.abs() < 1e-12));
        assert!((z[[0, 0]] + z[[2, 0]]).abs() < 1e-12);
        assert_eq!(scaler.scale[1], 1.0);
        assert_eq!(z.column(1).to_vec(), vec![0.0, 0.0, 0.0]);
    }
}
