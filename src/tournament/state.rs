//! Tournament state, round records and ranking

use crate::training::{CvScores, Metric, Regressor};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Where the orchestrator is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "round", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    RoundInProgress(usize),
    RoundComplete(usize),
    Finished,
}

/// One candidate's outcome in one round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub name: String,
    /// Mean CV score on the primary metric
    pub primary: f64,
    /// Mean CV score on the secondary metric
    pub secondary: f64,
    pub cv: CvScores,
    /// Fitted on the round subsample. Released once no longer needed.
    #[serde(skip)]
    pub checkpoint: Option<Box<dyn Regressor>>,
}

/// A candidate dropped from a round because it failed to fit or score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub name: String,
    pub reason: String,
}

/// Immutable record of a completed round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: usize,
    /// Rows used for this round's evaluation
    pub sample_size: usize,
    pub primary_metric: Metric,
    pub secondary_metric: Metric,
    /// Every successfully evaluated candidate, best first
    pub results: Vec<CandidateResult>,
    /// Candidates that advanced, best first
    pub survivors: Vec<String>,
    pub failures: Vec<CandidateFailure>,
}

impl RoundRecord {
    pub fn get(&self, name: &str) -> Option<&CandidateResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Rank-1 candidate of the round
    pub fn winner(&self) -> Option<&str> {
        self.results.first().map(|r| r.name.as_str())
    }

    pub fn ranking(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn advanced(&self, name: &str) -> bool {
        self.survivors.iter().any(|s| s == name)
    }

    pub fn checkpoint(&self, name: &str) -> Option<&dyn Regressor> {
        self.get(name).and_then(|r| r.checkpoint.as_deref())
    }

    pub(crate) fn release_checkpoints(&mut self, keep: &[String]) {
        for result in &mut self.results {
            if !keep.contains(&result.name) {
                result.checkpoint = None;
            }
        }
    }
}

/// Deterministic ordering: primary metric by its direction, then secondary,
/// then name in lexical order.
pub fn compare_results(a: &CandidateResult, b: &CandidateResult, primary: Metric, secondary: Metric) -> Ordering {
    primary
        .compare(a.primary, b.primary)
        .then_with(|| secondary.compare(a.secondary, b.secondary))
        .then_with(|| a.name.cmp(&b.name))
}

pub fn rank_results(results: &mut [CandidateResult], primary: Metric, secondary: Metric) {
    results.sort_by(|a, b| compare_results(a, b, primary, secondary));
}

/// Number of candidates advancing from a round of `n`
pub fn advance_count(n: usize) -> usize {
    n.div_ceil(2)
}

/// Everything the orchestrator has committed so far.
///
/// Only the orchestrator mutates it, and only by committing a whole round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentState {
    round_index: usize,
    surviving: Vec<String>,
    history: Vec<RoundRecord>,
    round_winners: Vec<String>,
    terminal: bool,
    final_winner: Option<String>,
    phase: Phase,
}

impl TournamentState {
    pub(crate) fn new(initial: Vec<String>) -> Self {
        Self {
            round_index: 0,
            surviving: initial,
            history: Vec::new(),
            round_winners: Vec::new(),
            terminal: false,
            final_winner: None,
            phase: Phase::Idle,
        }
    }

    /// Last completed round, 0 before the first
    pub fn round_index(&self) -> usize {
        self.round_index
    }

    pub fn surviving(&self) -> &[String] {
        &self.surviving
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn last_round(&self) -> Option<&RoundRecord> {
        self.history.last()
    }

    pub fn round_winners(&self) -> &[String] {
        &self.round_winners
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn final_winner(&self) -> Option<&str> {
        self.final_winner.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Most recent round `name` took part in
    pub fn last_record_for(&self, name: &str) -> Option<&RoundRecord> {
        self.history.iter().rev().find(|r| r.get(name).is_some())
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn commit_round(&mut self, mut record: RoundRecord) {
        // Older checkpoints are superseded; this round keeps only its survivors'
        for old in &mut self.history {
            old.release_checkpoints(&[]);
        }
        record.release_checkpoints(&record.survivors.clone());

        if let Some(winner) = record.winner() {
            self.round_winners.push(winner.to_string());
        }
        self.round_index = record.round;
        self.surviving = record.survivors.clone();
        self.phase = Phase::RoundComplete(record.round);
        self.history.push(record);
    }

    pub(crate) fn finish(&mut self, winner: String) {
        self.final_winner = Some(winner);
        self.terminal = true;
        self.phase = Phase::Finished;
    }
}
