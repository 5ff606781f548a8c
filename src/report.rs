//! Run summary
//!
//! A serialisable digest of a finished run: the per-round standings, the
//! winners by round and the final test scores.

use crate::error::Result;
use crate::finalize::FinalOutcome;
use crate::tournament::{TournamentConfig, TournamentState};
use crate::training::Metric;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use uuid::Uuid;

/// File name the CLI writes the report to
pub const REPORT_FILE: &str = "tournament_results.json";

/// One candidate's standing in one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRow {
    pub round: usize,
    pub rank: usize,
    pub model: String,
    pub rmse: Option<f64>,
    pub r2: Option<f64>,
    pub advanced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub seed: u64,
    pub primary_metric: Metric,
    pub rounds: Vec<RoundRow>,
    /// Candidates that failed, as `(round, name, reason)`
    pub failures: Vec<(usize, String, String)>,
    pub round_winners: Vec<String>,
    pub final_winner: Option<String>,
    pub test_rmse: Option<f64>,
    pub test_r2: Option<f64>,
}

impl TournamentReport {
    pub fn build(
        config: &TournamentConfig,
        state: &TournamentState,
        outcome: Option<&FinalOutcome>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut rounds = Vec::new();
        let mut failures = Vec::new();

        for record in state.history() {
            for (rank, result) in record.results.iter().enumerate() {
                rounds.push(RoundRow {
                    round: record.round,
                    rank: rank + 1,
                    model: result.name.clone(),
                    rmse: result.cv.mean(Metric::Rmse),
                    r2: result.cv.mean(Metric::R2),
                    advanced: record.advanced(&result.name),
                });
            }
            for failure in &record.failures {
                failures.push((record.round, failure.name.clone(), failure.reason.clone()));
            }
        }

        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            seed: config.seed,
            primary_metric: config.primary_metric,
            rounds,
            failures,
            round_winners: state.round_winners().to_vec(),
            final_winner: state.final_winner().map(str::to_string),
            test_rmse: outcome.map(FinalOutcome::test_rmse),
            test_r2: outcome.map(FinalOutcome::test_r2),
        }
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Plain-text report: standings per round, winners by round, final scores
    pub fn render_text(&self) -> String {
        let fmt_score = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v));
        let mut out = String::new();

        let _ = writeln!(out, "Tournament run {}", self.run_id);
        let _ = writeln!(
            out,
            "Seed {} | ranked by {} | {:.1}s",
            self.seed,
            self.primary_metric,
            (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
        );

        let mut current = 0;
        for row in &self.rounds {
            if row.round != current {
                current = row.round;
                let _ = writeln!(out, "\nRound {}", current);
                let _ = writeln!(out, "{:>4}  {:<24} {:>10} {:>10}  advanced", "rank", "model", "rmse", "r2");
            }
            let _ = writeln!(
                out,
                "{:>4}  {:<24} {:>10} {:>10}  {}",
                row.rank,
                row.model,
                fmt_score(row.rmse),
                fmt_score(row.r2),
                if row.advanced { "yes" } else { "no" }
            );
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out, "\nFailures");
            for (round, name, reason) in &self.failures {
                let _ = writeln!(out, "  round {}: {} ({})", round, name, reason);
            }
        }

        let _ = writeln!(out, "\nWinners by round");
        for (i, name) in self.round_winners.iter().enumerate() {
            let _ = writeln!(out, "  Round {}: {}", i + 1, name);
        }

        if let Some(winner) = &self.final_winner {
            let _ = writeln!(out, "\nFinal winner: {}", winner);
        }
        if let (Some(rmse), Some(r2)) = (self.test_rmse, self.test_r2) {
            let _ = writeln!(out, "Test RMSE: {:.4}  Test R²: {:.4}", rmse, r2);
        }
        out
    }
}
