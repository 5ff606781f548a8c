//! Standard (z-score) feature scaling

use super::Dataset;
use crate::error::{Result, TournamentError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Per-column mean/std scaler: `(x - mean) / std`.
///
/// Fitted once from a training split and immutable afterwards. The fitted
/// column names and their order are part of the scaler; anything handed to
/// `transform` must present exactly the same columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl StandardScaler {
    /// Fit the scaler to a dataset's feature columns.
    ///
    /// Uses the population standard deviation. A zero-variance column gets
    /// unit scale, or a `DataError` when `strict` is set.
    pub fn fit(data: &Dataset, strict: bool) -> Result<Self> {
        if data.is_empty() {
            return Err(TournamentError::DataError(
                "cannot fit scaler on an empty dataset".to_string(),
            ));
        }

        let x = data.features();
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| TournamentError::DataError("cannot compute column means".to_string()))?;
        let raw_std = x.std_axis(Axis(0), 0.0);

        let mut std = Array1::zeros(raw_std.len());
        for (j, &s) in raw_std.iter().enumerate() {
            if s == 0.0 || !s.is_finite() {
                if strict {
                    return Err(TournamentError::DataError(format!(
                        "column '{}' has zero variance",
                        data.feature_names()[j]
                    )));
                }
                std[j] = 1.0;
            } else {
                std[j] = s;
            }
        }

        Ok(Self {
            feature_names: data.feature_names().to_vec(),
            mean,
            std,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }

    /// Scale a dataset, checking its columns against the fitted ones
    pub fn transform(&self, data: &Dataset) -> Result<Dataset> {
        self.check_columns(data.feature_names())?;
        let scaled = self.transform_array(data.features())?;
        data.with_features(scaled)
    }

    /// Scale a raw matrix whose columns are already in fitted order
    pub fn transform_array(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(TournamentError::ScalingError {
                expected: format!("{} columns", self.n_features()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            row -= &self.mean;
            row /= &self.std;
        }
        Ok(out)
    }

    /// Scale a single observation (inference path)
    pub fn transform_row(&self, row: ArrayView1<f64>) -> Result<Array2<f64>> {
        let x = row.to_owned().insert_axis(Axis(0));
        self.transform_array(&x)
    }

    fn check_columns(&self, names: &[String]) -> Result<()> {
        if names != self.feature_names.as_slice() {
            return Err(TournamentError::ScalingError {
                expected: format!("columns {:?}", self.feature_names),
                actual: format!("columns {:?}", names),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn dataset(x: Array2<f64>, names: &[&str]) -> Dataset {
        let n = x.nrows();
        Dataset::new(
            names.iter().map(|s| s.to_string()).collect(),
            "y",
            x,
            Array1::zeros(n),
        )
        .unwrap()
    }

    #[test]
    fn test_standard_scaler_centers_columns() {
        let ds = dataset(array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]], &["a", "b"]);
        let scaler = StandardScaler::fit(&ds, false).unwrap();
        let scaled = scaler.transform(&ds).unwrap();

        for col in scaled.features().axis_iter(Axis(1)) {
            assert!(col.mean().unwrap().abs() < 1e-10);
            assert!((col.std(0.0) - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_zero_variance_gets_unit_scale() {
        let ds = dataset(array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]], &["flat", "b"]);
        let scaler = StandardScaler::fit(&ds, false).unwrap();
        assert_eq!(scaler.std()[0], 1.0);

        let scaled = scaler.transform(&ds).unwrap();
        assert!(scaled.features().column(0).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_zero_variance_strict_mode_errors() {
        let ds = dataset(array![[5.0, 1.0], [5.0, 2.0]], &["flat", "b"]);
        let err = StandardScaler::fit(&ds, true).unwrap_err();
        assert!(matches!(err, TournamentError::DataError(_)));
    }

    #[test]
    fn test_column_order_mismatch() {
        let ds = dataset(array![[1.0, 2.0], [3.0, 5.0]], &["a", "b"]);
        let scaler = StandardScaler::fit(&ds, false).unwrap();

        let swapped = dataset(array![[2.0, 1.0], [5.0, 3.0]], &["b", "a"]);
        let err = scaler.transform(&swapped).unwrap_err();
        assert!(matches!(err, TournamentError::ScalingError { .. }));
    }

    #[test]
    fn test_column_count_mismatch() {
        let ds = dataset(array![[1.0, 2.0], [3.0, 5.0]], &["a", "b"]);
        let scaler = StandardScaler::fit(&ds, false).unwrap();

        let err = scaler.transform_array(&array![[1.0, 2.0, 3.0]]).unwrap_err();
        assert!(matches!(err, TournamentError::ScalingError { .. }));
    }

    #[test]
    fn test_transform_row_matches_batch() {
        let ds = dataset(array![[1.0, 4.0], [3.0, 8.0]], &["a", "b"]);
        let scaler = StandardScaler::fit(&ds, false).unwrap();

        let batch = scaler.transform(&ds).unwrap();
        let single = scaler.transform_row(ds.features().row(1)).unwrap();
        assert_eq!(single.row(0), batch.features().row(1));
    }
}
