//! Training metrics tracking.

use serde::{Deserialize, Serialize};

/// Per-epoch loss history of one fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub epochs_completed: usize,
    pub loss_history: Vec<f64>,
}

impl TrainingMetrics {
    pub fn record_epoch(&mut self, loss: f64) {
        self.loss_history.push(loss);
        self.epochs_completed += 1;
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.loss_history.last().copied()
    }
}

/// Classification metrics for the positive class (label 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub f1_score: f64,
    pub precision: f64,
    pub recall: f64,
    pub accuracy: f64,
    /// `[[tn, fp], [fn, tp]]`
    pub confusion_matrix: [[usize; 2]; 2],
}

impl ClassificationMetrics {
    /// Score predicted labels against true labels.
    ///
    /// Ratios with a zero denominator are reported as 0.0.
    pub fn compute<'a>(
        y_true: impl IntoIterator<Item = &'a f64>,
        y_pred: impl IntoIterator<Item = &'a f64>,
    ) -> Self {
        let mut cm = [[0usize; 2]; 2];
        for (&t, &p) in y_true.into_iter().zip(y_pred) {
            let t = usize::from(t >= 0.5);
            let p = usize::from(p >= 0.5);
            cm[t][p] += 1;
        }
        let [[tn, fp], [fn_, tp]] = cm;
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            f1_score,
            precision,
            recall,
            accuracy: ratio(tp + tn, tn + fp + fn_ + tp),
            confusion_matrix: cm,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_metrics() {
        let mut metrics = TrainingMetrics::default();
        assert_eq!(metrics.final_loss(), None);
        metrics.record_epoch(0.5);
        metrics.record_epoch(0.3);
        assert_eq!(metrics.epochs_completed, 2);
        assert_eq!(metrics.loss_history, vec![0.5, 0.3]);
        assert_eq!(metrics.final_loss(), Some(0.3));
    }

    #[test]
    fn test_classification_scores() {
        let y_true = [1.0, 1.0, 0.0, 0.0, 1.0];
        let y_pred = [1.0, 0.0, 0.0, 1.0, 1.0];
        let m = ClassificationMetrics::compute(&y_true, &y_pred);
        assert_eq!(m.confusion_matrix, [[1, 1], [1, 2]]);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.accuracy - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_no_positive_predictions() {
        let m = ClassificationMetrics::compute(&[1.0, 0.0], &[0.0, 0.0]);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.f1_score, 0.0);
        assert_eq!(m.accuracy, 0.5);
    }
}
