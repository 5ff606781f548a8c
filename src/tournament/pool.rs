//! Candidate registry

use crate::error::{Result, TournamentError};
use crate::training::{
    ElasticNet, GradientBoostingRegressor, KnnRegressor, LinearRegression, MlpRegressor,
    RandomForestRegressor, Regressor, RidgeRegression, SvrRegressor, XGBoostRegressor,
};
use std::fmt;

/// A named competitor. The regressor held here is never fitted; rounds work
/// on fresh copies of it.
pub struct Candidate {
    name: String,
    regressor: Box<dyn Regressor>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, regressor: Box<dyn Regressor>) -> Self {
        Self {
            name: name.into(),
            regressor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate").field("name", &self.name).finish()
    }
}

/// Fixed, ordered set of candidates with unique names.
///
/// The pool is immutable once built. Which candidates are still alive is
/// tracked by the orchestrator, not here.
#[derive(Debug, Default)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate; names must be unique and non-empty
    pub fn with_candidate(mut self, name: impl Into<String>, regressor: impl Regressor + 'static) -> Result<Self> {
        self.push(Candidate::new(name, Box::new(regressor)))?;
        Ok(self)
    }

    pub fn from_candidates(candidates: Vec<Candidate>) -> Result<Self> {
        let mut pool = Self::new();
        for candidate in candidates {
            pool.push(candidate)?;
        }
        Ok(pool)
    }

    fn push(&mut self, candidate: Candidate) -> Result<()> {
        if candidate.name.trim().is_empty() {
            return Err(TournamentError::ConfigError("candidate name is empty".to_string()));
        }
        if self.get(&candidate.name).is_some() {
            return Err(TournamentError::ConfigError(format!(
                "duplicate candidate name '{}'",
                candidate.name
            )));
        }
        self.candidates.push(candidate);
        Ok(())
    }

    /// The default line-up of linear, neighbour, kernel, tree ensemble and
    /// neural regressors. Seeded models take `seed`.
    pub fn standard(seed: u64) -> Self {
        let candidates = vec![
            Candidate::new("LinearRegression", Box::new(LinearRegression::new())),
            Candidate::new("Ridge_alpha0.1", Box::new(RidgeRegression::new(0.1))),
            Candidate::new("Ridge_alpha1.0", Box::new(RidgeRegression::new(1.0))),
            Candidate::new("Lasso_alpha0.1", Box::new(ElasticNet::lasso(0.1))),
            Candidate::new("Lasso_alpha0.01", Box::new(ElasticNet::lasso(0.01))),
            Candidate::new("ElasticNet_0.5_0.5", Box::new(ElasticNet::new(0.5, 0.5))),
            Candidate::new("KNN_5", Box::new(KnnRegressor::new(5))),
            Candidate::new("KNN_10", Box::new(KnnRegressor::new(10))),
            Candidate::new("SVR_rbf", Box::new(SvrRegressor::rbf(1.0).with_random_state(seed))),
            Candidate::new("SVR_linear", Box::new(SvrRegressor::linear(1.0).with_random_state(seed))),
            Candidate::new("RandomForest_50", Box::new(RandomForestRegressor::new(50).with_random_state(seed))),
            Candidate::new("RandomForest_100", Box::new(RandomForestRegressor::new(100).with_random_state(seed))),
            Candidate::new("GradientBoosting_50", Box::new(GradientBoostingRegressor::new(50).with_random_state(seed))),
            Candidate::new("GradientBoosting_100", Box::new(GradientBoostingRegressor::new(100).with_random_state(seed))),
            Candidate::new("XGBoost_50", Box::new(XGBoostRegressor::with_estimators(50, seed))),
            Candidate::new("XGBoost_100", Box::new(XGBoostRegressor::with_estimators(100, seed))),
            Candidate::new("MLP_1layer", Box::new(MlpRegressor::with_hidden_layers(vec![100], seed))),
            Candidate::new("MLP_2layers", Box::new(MlpRegressor::with_hidden_layers(vec![100, 50], seed))),
        ];

        Self { candidates }
    }

    pub fn get(&self, name: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Candidate names in registration order
    pub fn names(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_pool() {
        let pool = CandidatePool::standard(42);
        assert_eq!(pool.len(), 18);
        assert_eq!(pool.names()[0], "LinearRegression");
        for name in ["SVR_rbf", "SVR_linear", "XGBoost_50", "XGBoost_100", "MLP_2layers"] {
            assert!(pool.get(name).is_some(), "{} missing", name);
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = CandidatePool::new()
            .with_candidate("A", LinearRegression::new())
            .and_then(|p| p.with_candidate("A", RidgeRegression::new(1.0)))
            .unwrap_err();
        assert!(matches!(err, TournamentError::ConfigError(_)));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(CandidatePool::new().with_candidate("  ", LinearRegression::new()).is_err());
    }
}
