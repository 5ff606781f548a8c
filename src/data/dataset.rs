//! In-memory tabular dataset

use crate::error::{Result, TournamentError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Ordered feature matrix with named columns plus a numeric target.
///
/// Column order is fixed at construction. Every transformation returns a new
/// `Dataset`; nothing mutates one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    feature_names: Vec<String>,
    target_name: String,
    features: Array2<f64>,
    target: Array1<f64>,
}

impl Dataset {
    /// Create a dataset, checking that names, columns and rows line up
    pub fn new(
        feature_names: Vec<String>,
        target_name: impl Into<String>,
        features: Array2<f64>,
        target: Array1<f64>,
    ) -> Result<Self> {
        if features.nrows() != target.len() {
            return Err(TournamentError::DataError(format!(
                "feature rows ({}) do not match target length ({})",
                features.nrows(),
                target.len()
            )));
        }
        if features.ncols() != feature_names.len() {
            return Err(TournamentError::ShapeError {
                expected: format!("{} feature columns", feature_names.len()),
                actual: format!("{} columns", features.ncols()),
            });
        }

        Ok(Self {
            feature_names,
            target_name: target_name.into(),
            features,
            target,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// Gather the given rows (in the given order) into a new dataset
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
            features: self.features.select(Axis(0), indices),
            target: self.target.select(Axis(0), indices),
        }
    }

    /// Same rows and target, replacement feature values (e.g. after scaling)
    pub(crate) fn with_features(&self, features: Array2<f64>) -> Result<Self> {
        Self::new(
            self.feature_names.clone(),
            self.target_name.clone(),
            features,
            self.target.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_rejects_row_mismatch() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let y = array![1.0];
        let err = Dataset::new(names(2), "y", x, y).unwrap_err();
        assert!(matches!(err, TournamentError::DataError(_)));
    }

    #[test]
    fn test_rejects_name_mismatch() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let y = array![1.0, 2.0];
        assert!(Dataset::new(names(3), "y", x, y).is_err());
    }

    #[test]
    fn test_select_rows_keeps_alignment() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let y = array![100.0, 200.0, 300.0];
        let ds = Dataset::new(names(2), "y", x, y).unwrap();

        let picked = ds.select_rows(&[2, 0]);
        assert_eq!(picked.n_rows(), 2);
        assert_eq!(picked.features()[[0, 1]], 30.0);
        assert_eq!(picked.target()[0], 300.0);
        assert_eq!(picked.target()[1], 100.0);
        assert_eq!(picked.feature_names(), ds.feature_names());
    }
}
