//! Holdout evaluation metrics.

use serde::{Deserialize, Serialize};

/// Scores of both models on the holdout split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub train_rows: usize,
    pub test_rows: usize,
    /// Price units.
    pub rmse: f64,
    pub r2: f64,
    pub clf_test_rows: usize,
    /// `None` when the holdout split has no resolved rows.
    pub accuracy: Option<f64>,
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }
    let sse: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p) * (a - p)).sum();
    (sse / n as f64).sqrt()
}

/// Coefficient of determination; `0` when the actual values are constant.
pub fn r2(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }
    let mean = actual[..n].iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = actual[..n].iter().map(|a| (a - mean) * (a - mean)).sum();
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p) * (a - p)).sum();
    if ss_tot <= 0.0 {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}

/// Share of rows whose 0/1 label matches `probability >= 0.5`.
pub fn accuracy(labels: &[f64], probabilities: &[f64]) -> f64 {
    let n = labels.len().min(probabilities.len());
    if n == 0 {
        return f64::NAN;
    }
    let hits = labels
        .iter()
        .zip(probabilities)
        .filter(|(l, p)| (**p >= 0.5) == (**l >= 0.5))
        .count();
    hits as f64 / n as f64
}
