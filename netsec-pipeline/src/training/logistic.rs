//! Binary logistic regression fitted with seeded mini-batch gradient descent.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Fault, Result, ResultExt};
use crate::training::metrics::TrainingMetrics;

/// Hyper-parameters for [`LogisticRegression::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionParams {
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub l2: f64,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            epochs: 200,
            batch_size: 16,
            l2: 1e-4,
        }
    }
}

/// Fitted model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Array1<f64>,
    pub bias: f64,
}

impl LogisticRegression {
    /// Fit on `x` (rows are samples) and 0/1 labels `y`.
    ///
    /// Deterministic for a given `seed`: the only randomness is the per-epoch
    /// batch order. Weights start at zero.
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        params: &LogisticRegressionParams,
        seed: u64,
    ) -> Result<(Self, TrainingMetrics)> {
        check_inputs(x, y, params).at("LogisticRegression::fit")?;

        let n = x.nrows();
        let mut model = Self {
            weights: Array1::zeros(x.ncols()),
            bias: 0.0,
        };
        let mut metrics = TrainingMetrics::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..n).collect();
        let batch_size = params.batch_size.clamp(1, n);

        for _ in 0..params.epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = y.select(Axis(0), batch);
                let residual = model.predict_proba(xb.view()) - &yb;
                let scale = 1.0 / batch.len() as f64;
                let grad_w = xb.t().dot(&residual) * scale + &model.weights * params.l2;
                let grad_b = residual.sum() * scale;
                model.weights.scaled_add(-params.learning_rate, &grad_w);
                model.bias -= params.learning_rate * grad_b;
            }
            let loss = model.log_loss(x, y);
            if !loss.is_finite() {
                return Err(Fault::numeric("loss diverged during fitting"))
                    .at("LogisticRegression::fit");
            }
            metrics.record_epoch(loss);
        }

        Ok((model, metrics))
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    /// Probability of the positive class for each row.
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Array1<f64> {
        (x.dot(&self.weights) + self.bias).mapv(sigmoid)
    }

    /// Hard 0/1 label for each row, threshold 0.5.
    pub fn predict(&self, x: ArrayView2<f64>) -> Array1<f64> {
        self.predict_proba(x)
            .mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 })
    }

    /// Mean binary cross-entropy.
    pub fn log_loss(&self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> f64 {
        let eps = 1e-12;
        let p = self.predict_proba(x);
        let total: f64 = p
            .iter()
            .zip(y.iter())
            .map(|(&p, &t)| {
                let p = p.clamp(eps, 1.0 - eps);
                -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
            })
            .sum();
        total / y.len().max(1) as f64
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn check_inputs(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    params: &LogisticRegressionParams,
) -> std::result::Result<(), Fault> {
    if x.nrows() == 0 {
        return Err(Fault::dataset("cannot fit on zero rows"));
    }
    if x.nrows() != y.len() {
        return Err(Fault::numeric(format!(
            "{} feature rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(Fault::numeric("features contain non-finite values"));
    }
    if let Some(bad) = y.iter().find(|&&t| t != 0.0 && t != 1.0) {
        return Err(Fault::schema(format!("labels must be 0 or 1, found {bad}")));
    }
    if !(params.learning_rate > 0.0) || params.epochs == 0 {
        return Err(Fault::invalid_setting(
            "learning rate must be positive and epochs non-zero",
        ));
    }
    Ok(())
}
