//! Regression metrics

use crate::error::{Result, TournamentError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A scoring metric and its comparison direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Root mean squared error
    Rmse,
    /// Coefficient of determination
    R2,
    /// Mean absolute error
    Mae,
    /// Mean squared error
    Mse,
}

impl Metric {
    pub fn lower_is_better(self) -> bool {
        !matches!(self, Metric::R2)
    }

    /// Order two scores so that the better one comes first
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        let ord = a.total_cmp(&b);
        if self.lower_is_better() {
            ord
        } else {
            ord.reverse()
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Rmse => "rmse",
            Metric::R2 => "r2",
            Metric::Mae => "mae",
            Metric::Mse => "mse",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "rmse" => Ok(Metric::Rmse),
            "r2" | "r²" => Ok(Metric::R2),
            "mae" => Ok(Metric::Mae),
            "mse" => Ok(Metric::Mse),
            other => Err(TournamentError::InvalidParameter {
                name: "metric".to_string(),
                value: other.to_string(),
                reason: "expected one of rmse, r2, mae, mse".to_string(),
            }),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metrics for one set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    /// Compute all regression metrics.
    ///
    /// R² is reported as 0 when the target has no variance.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(TournamentError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(TournamentError::DataError(
                "cannot score an empty prediction set".to_string(),
            ));
        }

        let n = y_true.len() as f64;
        let errors = y_true - y_pred;

        let mse = errors.mapv(|e| e * e).sum() / n;
        let mae = errors.mapv(f64::abs).sum() / n;

        let y_mean = y_true.sum() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2,
        })
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Rmse => self.rmse,
            Metric::R2 => self.r2,
            Metric::Mae => self.mae,
            Metric::Mse => self.mse,
        }
    }
}
