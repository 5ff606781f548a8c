//! Retrain the tournament winner on the full training split and persist it

use crate::data::PartitionedData;
use crate::error::{Result, TournamentError};
use crate::storage::{save_json, ArtifactStore, MODEL_ARTIFACT, SCALER_ARTIFACT};
use crate::tournament::TournamentState;
use crate::training::{RegressionMetrics, Regressor};
use std::sync::Arc;
use tracing::info;

/// Result of finalizing a tournament
#[derive(Debug)]
pub struct FinalOutcome {
    pub winner: String,
    pub model: Box<dyn Regressor>,
    pub test_metrics: RegressionMetrics,
    /// Artifact names written, model then scaler
    pub artifacts: (String, String),
}

impl FinalOutcome {
    pub fn test_rmse(&self) -> f64 {
        self.test_metrics.rmse
    }

    pub fn test_r2(&self) -> f64 {
        self.test_metrics.r2
    }
}

/// Turns a finished tournament into a persisted model.
///
/// Every failure here is fatal; there is no per-candidate tolerance.
pub struct FinalTrainer {
    store: Arc<dyn ArtifactStore>,
    model_artifact: String,
    scaler_artifact: String,
}

impl FinalTrainer {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            model_artifact: MODEL_ARTIFACT.to_string(),
            scaler_artifact: SCALER_ARTIFACT.to_string(),
        }
    }

    pub fn with_artifact_names(mut self, model: impl Into<String>, scaler: impl Into<String>) -> Self {
        self.model_artifact = model.into();
        self.scaler_artifact = scaler.into();
        self
    }

    pub fn finalize(&self, state: &TournamentState, data: &PartitionedData) -> Result<FinalOutcome> {
        let winner = state.final_winner().ok_or_else(|| {
            TournamentError::TournamentIntegrityError("tournament has no final winner".to_string())
        })?;

        let checkpoint = state
            .last_record_for(winner)
            .and_then(|record| record.checkpoint(winner))
            .ok_or_else(|| {
                TournamentError::TournamentIntegrityError(format!(
                    "no checkpoint available for winner '{}'",
                    winner
                ))
            })?;

        let mut model = checkpoint.fresh();
        model.fit(data.train_scaled.features(), data.train_scaled.target())?;

        let predictions = model.predict(data.test_scaled.features())?;
        let test_metrics = RegressionMetrics::compute(data.test_scaled.target(), &predictions)?;

        info!(
            winner = %winner,
            train_rows = data.train_scaled.n_rows(),
            test_rows = data.test_scaled.n_rows(),
            test_rmse = test_metrics.rmse,
            test_r2 = test_metrics.r2,
            "Final model evaluated"
        );

        self.store.save(&self.model_artifact, &model.to_bytes()?)?;
        save_json(self.store.as_ref(), &self.scaler_artifact, &data.scaler)?;
        info!(
            model = %self.model_artifact,
            scaler = %self.scaler_artifact,
            "Persisted final model and scaler"
        );

        Ok(FinalOutcome {
            winner: winner.to_string(),
            model,
            test_metrics,
            artifacts: (self.model_artifact.clone(), self.scaler_artifact.clone()),
        })
    }
}
