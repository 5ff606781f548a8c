//! Train/test partitioning and scaling

use super::{Dataset, StandardScaler};
use crate::error::{Result, TournamentError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Output of a full partition pass: raw splits, the fitted scaler and the
/// scaled splits the tournament and final trainer consume.
#[derive(Debug, Clone)]
pub struct PartitionedData {
    pub train: Dataset,
    pub test: Dataset,
    pub scaler: StandardScaler,
    pub train_scaled: Dataset,
    pub test_scaled: Dataset,
}

/// Splits a dataset into train/test and fits/applies the feature scaler
#[derive(Debug, Clone)]
pub struct DataPartitioner {
    test_fraction: f64,
    seed: u64,
    strict_scaling: bool,
}

impl DataPartitioner {
    pub fn new(test_fraction: f64, seed: u64) -> Self {
        Self {
            test_fraction,
            seed,
            strict_scaling: false,
        }
    }

    /// Fail on zero-variance columns instead of substituting unit variance
    pub fn with_strict_scaling(mut self, strict: bool) -> Self {
        self.strict_scaling = strict;
        self
    }

    /// Split, fit the scaler on the training rows and scale both halves
    pub fn partition(&self, dataset: &Dataset) -> Result<PartitionedData> {
        let (train, test) = Self::split(dataset, self.test_fraction, self.seed)?;
        let scaler = Self::fit_scaler(&train, self.strict_scaling)?;
        let train_scaled = Self::transform(&scaler, &train)?;
        let test_scaled = Self::transform(&scaler, &test)?;

        info!(
            train_rows = train.n_rows(),
            test_rows = test.n_rows(),
            features = train.n_features(),
            "Prepared train/test split"
        );

        Ok(PartitionedData {
            train,
            test,
            scaler,
            train_scaled,
            test_scaled,
        })
    }

    /// Deterministic shuffled split. The test side gets
    /// `ceil(n * test_fraction)` rows, clamped so both sides are non-empty.
    pub fn split(dataset: &Dataset, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
        let n = dataset.n_rows();
        if n < 2 {
            return Err(TournamentError::DataError(format!(
                "need at least 2 rows to split, got {}",
                n
            )));
        }
        if dataset.target_name().is_empty() {
            return Err(TournamentError::DataError(
                "dataset has no target column".to_string(),
            ));
        }
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(TournamentError::InvalidParameter {
                name: "test_fraction".to_string(),
                value: test_fraction.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }

        let n_test = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1);

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let (test_idx, train_idx) = indices.split_at(n_test);
        Ok((dataset.select_rows(train_idx), dataset.select_rows(test_idx)))
    }

    pub fn fit_scaler(train: &Dataset, strict: bool) -> Result<StandardScaler> {
        StandardScaler::fit(train, strict)
    }

    pub fn transform(scaler: &StandardScaler, data: &Dataset) -> Result<Dataset> {
        scaler.transform(data)
    }
}
