//! Distribution drift screening with the two-sample Kolmogorov–Smirnov test.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::source::DataBatch;

/// Outcome of a two-sample KS test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    /// Largest gap between the two empirical CDFs, in `[0, 1]`.
    pub statistic: f64,
    /// Asymptotic p-value with Stephens' small-sample correction.
    pub p_value: f64,
}

/// Two-sample KS test. Returns `None` if either sample is empty.
pub fn ks_2samp(a: &[f64], b: &[f64]) -> Option<KsResult> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n, m) = (a.len(), b.len());
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < n && j < m {
        let x = a[i].min(b[j]);
        while i < n && a[i] <= x {
            i += 1;
        }
        while j < m && b[j] <= x {
            j += 1;
        }
        let gap = (i as f64 / n as f64 - j as f64 / m as f64).abs();
        d = d.max(gap);
    }

    let en = ((n * m) as f64 / (n + m) as f64).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * d;
    Some(KsResult {
        statistic: d,
        p_value: kolmogorov_survival(lambda).clamp(0.0, 1.0),
    })
}

/// `Q_KS(lambda) = 2 * sum_{k>=1} (-1)^(k-1) exp(-2 k^2 lambda^2)`.
fn kolmogorov_survival(lambda: f64) -> f64 {
    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut previous = 0.0;
    for k in 1..=100 {
        let kf = k as f64;
        let term = fac * (a2 * kf * kf).exp();
        sum += term;
        if term.abs() <= 0.001 * previous || term.abs() <= 1e-8 * sum {
            return sum;
        }
        fac = -fac;
        previous = term.abs();
    }
    // The series only fails to converge as lambda -> 0, where Q -> 1.
    1.0
}

/// Drift verdict for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub p_value: f64,
    pub drift_status: bool,
}

/// Per-column drift verdicts, written to disk as YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriftReport {
    pub columns: BTreeMap<String, ColumnDrift>,
}

impl DriftReport {
    pub fn drift_detected(&self) -> bool {
        self.columns.values().any(|c| c.drift_status)
    }

    pub fn drifted_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|(_, c)| c.drift_status)
            .map(|(name, _)| name.as_str())
    }
}

/// Compare `current` against `base` for each named column present in both.
///
/// Columns without a numeric value on either side are left out of the report.
pub fn detect_drift(
    base: &DataBatch,
    current: &DataBatch,
    columns: &[String],
    threshold: f64,
) -> DriftReport {
    let mut report = DriftReport::default();
    for name in columns {
        let (Some(bi), Some(ci)) = (base.column_index(name), current.column_index(name)) else {
            continue;
        };
        let Some(result) = ks_2samp(&base.numeric_values(bi), &current.numeric_values(ci)) else {
            continue;
        };
        report.columns.insert(
            name.clone(),
            ColumnDrift {
                p_value: result.p_value,
                drift_status: result.p_value < threshold,
            },
        );
    }
    report
}
