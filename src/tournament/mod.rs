//! Elimination tournament
//!
//! - [`TournamentConfig`] - run settings
//! - [`CandidatePool`] - immutable, named competitors
//! - [`TournamentOrchestrator`] - runs rounds and owns [`TournamentState`]

mod config;
mod orchestrator;
mod pool;
mod state;

pub use config::TournamentConfig;
pub use orchestrator::{CancelToken, TournamentOrchestrator, TournamentOutcome};
pub use pool::{Candidate, CandidatePool};
pub use state::{
    advance_count, compare_results, rank_results, CandidateFailure, CandidateResult, Phase, RoundRecord,
    TournamentState,
};
