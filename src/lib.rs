//! Model Tournament - regression model selection by elimination
//!
//! A pool of candidate regressors competes over a bounded number of rounds.
//! Each round draws a reproducible subsample of the training data, scores
//! every survivor with k-fold cross-validation, ranks them and keeps the top
//! half. The last one standing is retrained on the full training split,
//! evaluated on the held-out test split and persisted with its scaler.
//!
//! # Modules
//!
//! ## Tournament
//! - [`tournament`] - config, candidate pool, round state machine, orchestrator
//! - [`finalize`] - winner retraining and persistence
//! - [`report`] - per-round standings and run summary
//!
//! ## Data and models
//! - [`data`] - dataset loading, train/test partition, standard scaling
//! - [`training`] - regressors, metrics, cross-validation
//! - [`storage`] - named artifact persistence
//!
//! ## Services
//! - [`server`] - HTTP inference endpoint
//! - [`cli`] - command-line interface

// Core error handling
pub mod error;

// Data and models
pub mod data;
pub mod storage;
pub mod training;

// Tournament
pub mod finalize;
pub mod report;
pub mod tournament;

// Services
pub mod cli;
pub mod server;

pub use error::{Result, TournamentError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, TournamentError};

    // Data
    pub use crate::data::{DataPartitioner, Dataset, DatasetLoader, PartitionedData, StandardScaler};

    // Training
    pub use crate::training::{KFold, Metric, RegressionMetrics, Regressor, TrainedModel};

    // Tournament
    pub use crate::tournament::{
        CancelToken, CandidatePool, RoundRecord, TournamentConfig, TournamentOrchestrator, TournamentState,
    };
    pub use crate::finalize::{FinalOutcome, FinalTrainer};
    pub use crate::report::TournamentReport;

    // Storage
    pub use crate::storage::{ArtifactStore, LocalArtifactStore, MemoryArtifactStore};
}
