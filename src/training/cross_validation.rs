//! K-fold cross-validation

use super::metrics::{Metric, RegressionMetrics};
use super::Regressor;
use crate::error::{Result, TournamentError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single train/validation split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter.
///
/// The first `n % k` folds receive one extra row. Without shuffling the folds
/// are contiguous blocks, which is what scikit-learn's integer `cv` does for
/// regressors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Shuffle rows before cutting folds, seeded for reproducibility
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.random_state = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate train/validation splits for `n_samples` rows
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(TournamentError::InvalidParameter {
                name: "n_splits".to_string(),
                value: self.n_splits.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if n_samples < self.n_splits {
            return Err(TournamentError::DataError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;
        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }

        Ok(splits)
    }
}

/// Cross-validated scores for one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvScores {
    /// Mean of each requested metric across folds
    pub means: BTreeMap<Metric, f64>,
    /// Standard deviation of each requested metric across folds
    pub stds: BTreeMap<Metric, f64>,
    /// Per-fold metrics, in fold order
    pub folds: Vec<RegressionMetrics>,
}

impl CvScores {
    /// Aggregate per-fold metrics by plain averaging (order independent)
    pub fn from_folds(folds: Vec<RegressionMetrics>, metrics: &[Metric]) -> Self {
        let n = folds.len() as f64;
        let mut means = BTreeMap::new();
        let mut stds = BTreeMap::new();

        for &metric in metrics {
            let values: Vec<f64> = folds.iter().map(|f| f.get(metric)).collect();
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            means.insert(metric, mean);
            stds.insert(metric, variance.sqrt());
        }

        Self { means, stds, folds }
    }

    pub fn mean(&self, metric: Metric) -> Option<f64> {
        self.means.get(&metric).copied()
    }

    pub fn n_folds(&self) -> usize {
        self.folds.len()
    }
}

/// Run k-fold cross-validation of `model` on `(x, y)`.
///
/// Each fold trains an unfitted copy of the model, so `model` itself is left
/// untouched. Folds run in parallel. A non-finite score counts as a failure.
pub fn cross_validate<R: Regressor + ?Sized>(
    model: &R,
    x: &Array2<f64>,
    y: &Array1<f64>,
    folds: &KFold,
    metrics: &[Metric],
) -> Result<CvScores> {
    if x.nrows() != y.len() {
        return Err(TournamentError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    let splits = folds.split(x.nrows())?;

    let fold_metrics: Vec<RegressionMetrics> = splits
        .par_iter()
        .map(|split| {
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train = y.select(Axis(0), &split.train_indices);
            let x_val = x.select(Axis(0), &split.test_indices);
            let y_val = y.select(Axis(0), &split.test_indices);

            let mut fold_model = model.fresh();
            fold_model.fit(&x_train, &y_train)?;
            let y_pred = fold_model.predict(&x_val)?;
            let scores = RegressionMetrics::compute(&y_val, &y_pred)?;

            if metrics.iter().any(|m| !scores.get(*m).is_finite()) {
                return Err(TournamentError::DataError(format!(
                    "non-finite score on fold {}",
                    split.fold_idx
                )));
            }
            Ok(scores)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CvScores::from_folds(fold_metrics, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::LinearRegression;

    #[test]
    fn test_k_fold() {
        let splits = KFold::new(5).split(100).unwrap();
        assert_eq!(splits.len(), 5);

        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_uneven_folds() {
        let sizes: Vec<usize> = KFold::new(3)
            .split(10)
            .unwrap()
            .iter()
            .map(|s| s.test_indices.len())
            .collect();
        assert_eq!(sizes, vec![4, 3, 3]);
    }

    #[test]
    fn test_shuffled_split_is_seeded() {
        let a = KFold::new(3).with_shuffle(9).split(30).unwrap();
        let b = KFold::new(3).with_shuffle(9).split(30).unwrap();
        assert_eq!(a[0].test_indices, b[0].test_indices);
        assert_ne!(a[0].test_indices, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_too_few_samples() {
        assert!(KFold::new(5).split(3).is_err());
        assert!(KFold::new(1).split(10).is_err());
    }

    #[test]
    fn test_cross_validate_linear_data() {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| (i as f64) * (j as f64 + 1.0) + (i % 3) as f64);
        let y = Array1::from_shape_fn(30, |i| 2.0 * x[[i, 0]] - x[[i, 1]] + 1.0);

        let model = LinearRegression::new();
        let scores = cross_validate(&model, &x, &y, &KFold::new(3), &[Metric::Rmse, Metric::R2]).unwrap();

        assert_eq!(scores.n_folds(), 3);
        assert!(scores.mean(Metric::Rmse).unwrap() < 1e-6);
        assert!(scores.mean(Metric::R2).unwrap() > 0.999);
        assert!(scores.mean(Metric::Mae).is_none());
    }
}
