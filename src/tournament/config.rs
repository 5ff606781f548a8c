//! Tournament run configuration

use crate::data::DEFAULT_DROP_COLUMNS;
use crate::error::{Result, TournamentError};
use crate::training::Metric;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything that shapes a tournament run, from data preparation to
/// artifact output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    pub target_column: String,
    /// Share of rows held out for the final test evaluation
    pub test_fraction: f64,
    /// Base seed for the split, per-round subsamples and seeded models
    pub seed: u64,
    /// Share of the training rows each round evaluates on
    pub tournament_data_fraction: f64,
    /// Maximum number of rounds
    pub tournament_rounds: usize,
    pub cv_folds: usize,
    pub metrics: Vec<Metric>,
    pub primary_metric: Metric,
    /// Tie-breaker; derived from `metrics` when unset
    pub secondary_metric: Option<Metric>,
    pub strict_scaling: bool,
    /// Worker threads for candidate evaluation; `None` uses the global pool
    pub n_jobs: Option<usize>,
    pub persist_round_checkpoints: bool,
    /// First column of the input file is a row index, whatever its name
    pub index_column: bool,
    pub drop_columns: Vec<String>,
    pub artifacts_dir: PathBuf,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            target_column: "co2".to_string(),
            test_fraction: 0.2,
            seed: 42,
            tournament_data_fraction: 0.3,
            tournament_rounds: 3,
            cv_folds: 3,
            metrics: vec![Metric::Rmse, Metric::R2],
            primary_metric: Metric::Rmse,
            secondary_metric: None,
            strict_scaling: false,
            n_jobs: None,
            persist_round_checkpoints: false,
            index_column: false,
            drop_columns: DEFAULT_DROP_COLUMNS.iter().map(|s| s.to_string()).collect(),
            artifacts_dir: PathBuf::from("models"),
        }
    }
}

impl TournamentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_column(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_data_fraction(mut self, fraction: f64) -> Self {
        self.tournament_data_fraction = fraction;
        self
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.tournament_rounds = rounds;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_primary_metric(mut self, metric: Metric) -> Self {
        self.primary_metric = metric;
        self
    }

    pub fn with_secondary_metric(mut self, metric: Metric) -> Self {
        self.secondary_metric = Some(metric);
        self
    }

    pub fn with_strict_scaling(mut self, strict: bool) -> Self {
        self.strict_scaling = strict;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    pub fn with_round_checkpoints(mut self, persist: bool) -> Self {
        self.persist_round_checkpoints = persist;
        self
    }

    pub fn with_index_column(mut self, index_column: bool) -> Self {
        self.index_column = index_column;
        self
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    /// The tie-breaking metric: the explicit setting, else the first
    /// configured metric other than the primary, else the primary itself.
    pub fn secondary(&self) -> Metric {
        self.secondary_metric.unwrap_or_else(|| {
            self.metrics
                .iter()
                .copied()
                .find(|m| *m != self.primary_metric)
                .unwrap_or(self.primary_metric)
        })
    }

    /// Metrics cross-validation must compute: the configured set plus
    /// whatever ranking needs.
    pub fn scoring_metrics(&self) -> Vec<Metric> {
        let mut metrics = self.metrics.clone();
        for m in [self.primary_metric, self.secondary()] {
            if !metrics.contains(&m) {
                metrics.push(m);
            }
        }
        metrics
    }

    pub fn validate(&self) -> Result<()> {
        let fraction_ok = |f: f64| f > 0.0 && f < 1.0;

        if !fraction_ok(self.test_fraction) {
            return Err(TournamentError::InvalidParameter {
                name: "test_fraction".to_string(),
                value: self.test_fraction.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        if !(self.tournament_data_fraction > 0.0 && self.tournament_data_fraction <= 1.0) {
            return Err(TournamentError::InvalidParameter {
                name: "tournament_data_fraction".to_string(),
                value: self.tournament_data_fraction.to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }
        if self.tournament_rounds == 0 {
            return Err(TournamentError::ConfigError(
                "tournament_rounds must be at least 1".to_string(),
            ));
        }
        if self.cv_folds < 2 {
            return Err(TournamentError::InvalidParameter {
                name: "cv_folds".to_string(),
                value: self.cv_folds.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.metrics.is_empty() {
            return Err(TournamentError::ConfigError("metric set is empty".to_string()));
        }
        if !self.metrics.contains(&self.primary_metric) {
            return Err(TournamentError::ConfigError(format!(
                "primary metric '{}' is not in the metric set",
                self.primary_metric
            )));
        }
        if self.target_column.trim().is_empty() {
            return Err(TournamentError::ConfigError("target_column is empty".to_string()));
        }
        if self.n_jobs == Some(0) {
            return Err(TournamentError::InvalidParameter {
                name: "n_jobs".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            TournamentError::ConfigError(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = TournamentConfig::default();
        assert_eq!(config.target_column, "co2");
        assert_eq!(config.tournament_rounds, 3);
        assert_eq!(config.secondary(), Metric::R2);
        assert!(config.drop_columns.iter().any(|c| c == "timestamp"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_secondary_derivation() {
        let config = TournamentConfig::default()
            .with_metrics(vec![Metric::R2, Metric::Mae])
            .with_primary_metric(Metric::R2);
        assert_eq!(config.secondary(), Metric::Mae);

        let single = TournamentConfig::default().with_metrics(vec![Metric::Rmse]);
        assert_eq!(single.secondary(), Metric::Rmse);
        assert_eq!(single.scoring_metrics(), vec![Metric::Rmse]);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(TournamentConfig::default().with_test_fraction(1.0).validate().is_err());
        assert!(TournamentConfig::default().with_data_fraction(0.0).validate().is_err());
        assert!(TournamentConfig::default().with_rounds(0).validate().is_err());
        assert!(TournamentConfig::default().with_cv_folds(1).validate().is_err());
        assert!(TournamentConfig::default().with_metrics(vec![]).validate().is_err());
        assert!(TournamentConfig::default()
            .with_metrics(vec![Metric::R2])
            .validate()
            .is_err());
    }

    #[test]
    fn test_json_round_trip_and_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let config = TournamentConfig::default().with_seed(7).with_rounds(5);
        config.save_json(&path).unwrap();
        assert_eq!(TournamentConfig::from_json_file(&path).unwrap(), config);

        std::fs::write(&path, r#"{"seed": 11, "primary_metric": "r2"}"#).unwrap();
        let partial = TournamentConfig::from_json_file(&path).unwrap();
        assert_eq!(partial.seed, 11);
        assert_eq!(partial.primary_metric, Metric::R2);
        assert_eq!(partial.cv_folds, 3);
    }
}
