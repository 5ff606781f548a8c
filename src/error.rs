//! Error types for the model tournament

use thiserror::Error;

/// Result type alias for tournament operations
pub type Result<T> = std::result::Result<T, TournamentError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum TournamentError {
    #[error("Data error: {0}")]
    DataError(String),

    /// A single candidate failed to fit or score. Never escapes a round.
    #[error("Model failure in candidate '{candidate}': {reason}")]
    ModelFailure { candidate: String, reason: String },

    #[error("Scaling error: expected {expected}, got {actual}")]
    ScalingError { expected: String, actual: String },

    #[error("Tournament integrity error: {0}")]
    TournamentIntegrityError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Tournament cancelled during round {round}")]
    Cancelled { round: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl TournamentError {
    /// Whether this error aborts the stage it occurred in.
    ///
    /// Only a per-candidate `ModelFailure` is recoverable; the orchestrator
    /// drops the candidate for the round and carries on.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TournamentError::ModelFailure { .. })
    }

    pub(crate) fn model_failure(candidate: &str, err: impl std::fmt::Display) -> Self {
        TournamentError::ModelFailure {
            candidate: candidate.to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for TournamentError {
    fn from(err: polars::error::PolarsError) -> Self {
        TournamentError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TournamentError {
    fn from(err: serde_json::Error) -> Self {
        TournamentError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TournamentError {
    fn from(err: ndarray::ShapeError) -> Self {
        TournamentError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
