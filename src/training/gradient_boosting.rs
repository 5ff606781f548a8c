//! Gradient boosted regression trees with squared loss

use super::decision_tree::DecisionTreeRegressor;
use super::regressor::impl_regressor;
use crate::error::{Result, TournamentError};
use ndarray::{Array1, Array2};
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each stage
    pub subsample: f64,
    pub random_state: u64,
    init: Option<f64>,
    stages: Vec<DecisionTreeRegressor>,
    n_features: usize,
}

impl GradientBoostingRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: 42,
            init: None,
            stages: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(TournamentError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(TournamentError::DataError("cannot boost on zero rows".to_string()));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) || self.learning_rate <= 0.0 {
            return Err(TournamentError::InvalidParameter {
                name: "subsample/learning_rate".to_string(),
                value: format!("{}/{}", self.subsample, self.learning_rate),
                reason: "subsample must be in (0, 1] and learning_rate positive".to_string(),
            });
        }

        let init = y.sum() / n_samples as f64;
        let mut current = Array1::from_elem(n_samples, init);
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let n_draw = ((n_samples as f64 * self.subsample).round() as usize).clamp(1, n_samples);

        let mut stages = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            // Negative gradient of squared loss
            let residuals = y - &current;

            let rows: Vec<usize> = if n_draw < n_samples {
                let mut picked = sample(&mut rng, n_samples, n_draw).into_vec();
                picked.sort_unstable();
                picked
            } else {
                (0..n_samples).collect()
            };

            let mut tree = DecisionTreeRegressor::new()
                .with_max_depth(self.max_depth)
                .with_min_samples_leaf(self.min_samples_leaf)
                .with_seed(rng.gen());
            tree.fit_indices(x, &residuals, &rows)?;

            let update = tree.predict(x)?;
            current.scaled_add(self.learning_rate, &update);
            stages.push(tree);
        }

        self.init = Some(init);
        self.stages = stages;
        self.n_features = x.ncols();
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let init = self.init.ok_or(TournamentError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(TournamentError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut out = Array1::from_elem(x.nrows(), init);
        for tree in &self.stages {
            out.scaled_add(self.learning_rate, &tree.predict(x)?);
        }
        Ok(out)
    }

    fn unfitted(&self) -> Self {
        Self {
            init: None,
            stages: Vec::new(),
            n_features: 0,
            ..self.clone()
        }
    }
}

impl_regressor!(GradientBoostingRegressor, GradientBoosting);
