//! Held-out evaluation metrics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Regression error metrics computed on the held-out set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl EvalMetrics {
    /// Compute metrics from predictions against targets.
    ///
    /// R² is 0 when the targets have no variance (a constant predictor is
    /// as good as it gets there).
    pub fn compute(predictions: &[f64], targets: &[f64]) -> Self {
        debug_assert_eq!(predictions.len(), targets.len());
        let n = targets.len();
        if n == 0 {
            return EvalMetrics {
                mae: 0.0,
                rmse: 0.0,
                r2: 0.0,
            };
        }

        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for (p, t) in predictions.iter().zip(targets.iter()) {
            let err = p - t;
            abs_sum += err.abs();
            sq_sum += err * err;
        }

        let mean = targets.iter().sum::<f64>() / n as f64;
        let ss_tot: f64 = targets.iter().map(|t| (t - mean) * (t - mean)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - sq_sum / ss_tot } else { 0.0 };

        EvalMetrics {
            mae: abs_sum / n as f64,
            rmse: (sq_sum / n as f64).sqrt(),
            r2,
        }
    }
}

impl fmt::Display for EvalMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAE: {:.2} | RMSE: {:.2} | R²: {:.4}",
            self.mae, self.rmse, self.r2
        )
    }
}

/// Standard deviation of a label column; the scale confidence is judged
/// against.
pub fn label_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    var.sqrt()
}
