//! Round-based elimination tournament

use super::config::TournamentConfig;
use super::pool::{Candidate, CandidatePool};
use super::state::{advance_count, rank_results, CandidateFailure, CandidateResult, Phase, RoundRecord, TournamentState};
use crate::data::Dataset;
use crate::error::{Result, TournamentError};
use crate::storage::ArtifactStore;
use crate::training::{KFold, Metric};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared stop flag. Setting it makes the round in flight discard its work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Outcome of a full tournament
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentOutcome {
    pub winner: String,
    pub rounds_run: usize,
    /// True when the round budget ran out with more than one survivor and the
    /// last round's rank-1 candidate was taken as winner
    pub budget_exhausted: bool,
}

/// Drives candidates through successive elimination rounds.
///
/// Each round subsamples the (scaled) training set, cross-validates every
/// surviving candidate in parallel, fits a checkpoint, ranks, and advances
/// the top half. State changes only when a round completes in full.
pub struct TournamentOrchestrator {
    config: TournamentConfig,
    pool: CandidatePool,
    train: Dataset,
    state: TournamentState,
    cancel: CancelToken,
    thread_pool: Option<rayon::ThreadPool>,
    checkpoint_store: Option<Arc<dyn ArtifactStore>>,
}

impl TournamentOrchestrator {
    pub fn new(config: TournamentConfig, pool: CandidatePool, train: Dataset) -> Result<Self> {
        config.validate()?;
        if pool.is_empty() {
            return Err(TournamentError::ConfigError("candidate pool is empty".to_string()));
        }
        if train.is_empty() {
            return Err(TournamentError::DataError("training set is empty".to_string()));
        }

        let thread_pool = match config.n_jobs {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| TournamentError::ConfigError(format!("cannot build worker pool: {}", e)))?,
            ),
            None => None,
        };

        let state = TournamentState::new(pool.names());
        Ok(Self {
            config,
            pool,
            train,
            state,
            cancel: CancelToken::new(),
            thread_pool,
            checkpoint_store: None,
        })
    }

    /// Where round checkpoints go when `persist_round_checkpoints` is set
    pub fn with_checkpoint_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.checkpoint_store = Some(store);
        self
    }

    /// Share an externally owned stop flag
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> &TournamentState {
        &self.state
    }

    pub fn into_state(self) -> TournamentState {
        self.state
    }

    pub fn config(&self) -> &TournamentConfig {
        &self.config
    }

    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    /// Rows each round evaluates on
    pub fn round_sample_size(&self) -> usize {
        (self.train.n_rows() as f64 * self.config.tournament_data_fraction).floor() as usize
    }

    /// Seeded stream for a round: the base seed picks the key, the round
    /// number picks the stream.
    fn round_rng(&self, round: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        rng.set_stream(round as u64);
        rng
    }

    /// Row indices of the round subsample, drawn without replacement
    pub fn round_sample(&self, round: usize) -> Vec<usize> {
        let mut rng = self.round_rng(round);
        sample(&mut rng, self.train.n_rows(), self.round_sample_size()).into_vec()
    }

    /// Run one round over `survivors` and commit it.
    ///
    /// Returns the names advancing to the next round, best first. A failing
    /// candidate is dropped from this round only; if all fail the round is a
    /// `TournamentIntegrityError`. Nothing is committed unless the round
    /// completes and was not cancelled.
    pub fn run_round(&mut self, survivors: &[String], round: usize) -> Result<Vec<String>> {
        if self.state.is_terminal() {
            return Err(TournamentError::TournamentIntegrityError(
                "tournament already finished".to_string(),
            ));
        }
        let expected = self.state.round_index() + 1;
        if round != expected {
            return Err(TournamentError::TournamentIntegrityError(format!(
                "round {} out of order (next round is {})",
                round, expected
            )));
        }
        if round > self.config.tournament_rounds {
            return Err(TournamentError::TournamentIntegrityError(format!(
                "round {} exceeds the budget of {} rounds",
                round, self.config.tournament_rounds
            )));
        }
        if survivors.is_empty() {
            return Err(TournamentError::TournamentIntegrityError(format!(
                "round {} has no competitors",
                round
            )));
        }

        let mut candidates: Vec<&Candidate> = Vec::with_capacity(survivors.len());
        for name in survivors {
            let candidate = self.pool.get(name).ok_or_else(|| {
                TournamentError::TournamentIntegrityError(format!("unknown candidate '{}'", name))
            })?;
            if !self.state.surviving().contains(name) {
                return Err(TournamentError::TournamentIntegrityError(format!(
                    "candidate '{}' is not among the survivors of round {}",
                    name,
                    round - 1
                )));
            }
            if candidates.iter().any(|c| c.name() == name) {
                return Err(TournamentError::TournamentIntegrityError(format!(
                    "candidate '{}' entered round {} twice",
                    name, round
                )));
            }
            candidates.push(candidate);
        }

        let previous_phase = self.state.phase();
        self.state.set_phase(Phase::RoundInProgress(round));

        match self.evaluate_round(&candidates, round) {
            Ok(record) => {
                let advanced = record.survivors.clone();
                self.state.commit_round(record);
                Ok(advanced)
            }
            Err(err) => {
                self.state.set_phase(previous_phase);
                Err(err)
            }
        }
    }

    fn evaluate_round(&self, candidates: &[&Candidate], round: usize) -> Result<RoundRecord> {
        let start = Instant::now();
        if self.cancel.is_cancelled() {
            return Err(TournamentError::Cancelled { round });
        }

        let indices = self.round_sample(round);
        let folds = KFold::new(self.config.cv_folds);
        if indices.len() < self.config.cv_folds {
            return Err(TournamentError::DataError(format!(
                "round {} sample has {} rows, fewer than {} CV folds",
                round,
                indices.len(),
                self.config.cv_folds
            )));
        }

        let subsample = self.train.select_rows(&indices);
        let x = subsample.features();
        let y = subsample.target();
        let primary = self.config.primary_metric;
        let secondary = self.config.secondary();
        let metrics = self.config.scoring_metrics();

        info!(
            round,
            competitors = candidates.len(),
            sample_size = indices.len(),
            "Starting tournament round"
        );

        let evaluate = |candidate: &&Candidate| -> (String, Result<CandidateResult>) {
            let name = candidate.name().to_string();
            if self.cancel.is_cancelled() {
                return (name, Err(TournamentError::Cancelled { round }));
            }

            let outcome = (|| -> Result<CandidateResult> {
                let regressor = candidate.regressor();
                let cv = regressor.cross_validate(x, y, &folds, &metrics)?;
                let score = |m: Metric| {
                    cv.mean(m).ok_or_else(|| {
                        TournamentError::DataError(format!("metric '{}' was not computed", m))
                    })
                };
                let (p, s) = (score(primary)?, score(secondary)?);
                if !p.is_finite() || !s.is_finite() {
                    return Err(TournamentError::DataError(format!(
                        "non-finite CV score ({} = {}, {} = {})",
                        primary, p, secondary, s
                    )));
                }

                let mut checkpoint = regressor.fresh();
                checkpoint.fit(x, y)?;

                Ok(CandidateResult {
                    name: name.clone(),
                    primary: p,
                    secondary: s,
                    cv,
                    checkpoint: Some(checkpoint),
                })
            })();

            (name, outcome)
        };

        let outcomes: Vec<(String, Result<CandidateResult>)> = match &self.thread_pool {
            Some(pool) => pool.install(|| candidates.par_iter().map(evaluate).collect()),
            None => candidates.par_iter().map(evaluate).collect(),
        };

        // All-or-nothing: partial work from a cancelled round is dropped
        if self.cancel.is_cancelled() {
            warn!(round, "Round cancelled; discarding partial results");
            return Err(TournamentError::Cancelled { round });
        }

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    debug!(
                        round,
                        candidate = %name,
                        primary = result.primary,
                        secondary = result.secondary,
                        "Candidate evaluated"
                    );
                    results.push(result);
                }
                Err(err) => {
                    let failure = TournamentError::model_failure(&name, &err);
                    warn!(round, candidate = %name, error = %err, "Candidate failed; dropped from round");
                    failures.push(CandidateFailure {
                        name,
                        reason: failure.to_string(),
                    });
                }
            }
        }

        if results.is_empty() {
            return Err(TournamentError::TournamentIntegrityError(format!(
                "every candidate failed in round {}",
                round
            )));
        }

        rank_results(&mut results, primary, secondary);
        let n_advance = advance_count(results.len());
        let survivors: Vec<String> = results.iter().take(n_advance).map(|r| r.name.clone()).collect();

        let record = RoundRecord {
            round,
            sample_size: indices.len(),
            primary_metric: primary,
            secondary_metric: secondary,
            results,
            survivors,
            failures,
        };

        if self.config.persist_round_checkpoints {
            self.persist_checkpoints(&record)?;
        }

        info!(
            round,
            winner = record.winner().unwrap_or_default(),
            evaluated = record.results.len(),
            failed = record.failures.len(),
            advanced = record.survivors.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Round complete"
        );

        Ok(record)
    }

    fn persist_checkpoints(&self, record: &RoundRecord) -> Result<()> {
        let Some(store) = &self.checkpoint_store else {
            return Err(TournamentError::ConfigError(
                "round checkpoints requested but no artifact store attached".to_string(),
            ));
        };
        for result in &record.results {
            if let Some(model) = &result.checkpoint {
                store.save(&format!("round{}_{}", record.round, result.name), &model.to_bytes()?)?;
            }
        }
        Ok(())
    }

    /// Run rounds until one candidate remains or the round budget is spent.
    ///
    /// With several survivors left after the last allowed round, the winner
    /// is the last round's rank-1 candidate.
    pub fn run_tournament(&mut self) -> Result<TournamentOutcome> {
        if self.state.is_terminal() {
            return Err(TournamentError::TournamentIntegrityError(
                "tournament already finished".to_string(),
            ));
        }

        info!(
            candidates = self.state.surviving().len(),
            max_rounds = self.config.tournament_rounds,
            seed = self.config.seed,
            "Starting tournament"
        );

        let first = self.state.round_index() + 1;
        let mut rounds_run = 0;
        for round in first..=self.config.tournament_rounds {
            if self.state.surviving().len() <= 1 {
                break;
            }
            let survivors = self.state.surviving().to_vec();
            self.run_round(&survivors, round)?;
            rounds_run += 1;
        }

        let surviving = self.state.surviving();
        let (winner, budget_exhausted) = match surviving {
            [only] => (only.clone(), false),
            [] => {
                return Err(TournamentError::TournamentIntegrityError(
                    "no survivors left".to_string(),
                ))
            }
            _ => match self.state.round_winners().last() {
                Some(last) => (last.clone(), true),
                None => {
                    return Err(TournamentError::TournamentIntegrityError(
                        "round budget allowed no rounds".to_string(),
                    ))
                }
            },
        };

        info!(winner = %winner, rounds_run, budget_exhausted, "Tournament finished");
        self.state.finish(winner.clone());

        Ok(TournamentOutcome {
            winner,
            rounds_run,
            budget_exhausted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{LinearRegression, RidgeRegression};
    use ndarray::{Array1, Array2};

    fn train_set(n: usize) -> Dataset {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| ((i * (j + 2)) % 13) as f64);
        let y = Array1::from_shape_fn(n, |i| 1.5 * x[[i, 0]] - 0.5 * x[[i, 1]]);
        Dataset::new(vec!["a".into(), "b".into()], "y", x, y).unwrap()
    }

    fn pool() -> CandidatePool {
        CandidatePool::new()
            .with_candidate("ols", LinearRegression::new())
            .and_then(|p| p.with_candidate("ridge", RidgeRegression::new(1.0)))
            .unwrap()
    }

    #[test]
    fn test_round_sample_is_deterministic_per_round() {
        let orch = TournamentOrchestrator::new(TournamentConfig::default(), pool(), train_set(100)).unwrap();
        assert_eq!(orch.round_sample_size(), 30);
        assert_eq!(orch.round_sample(1), orch.round_sample(1));
        assert_ne!(orch.round_sample(1), orch.round_sample(2));

        let mut unique = orch.round_sample(1);
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 30);
    }

    #[test]
    fn test_two_candidates_one_round() {
        let mut orch = TournamentOrchestrator::new(TournamentConfig::default(), pool(), train_set(100)).unwrap();
        let outcome = orch.run_tournament().unwrap();

        assert_eq!(outcome.rounds_run, 1);
        assert!(!outcome.budget_exhausted);
        let state = orch.state();
        assert!(state.is_terminal());
        assert_eq!(state.phase(), Phase::Finished);
        assert_eq!(state.final_winner(), Some(outcome.winner.as_str()));
        assert!(state.last_round().unwrap().checkpoint(&outcome.winner).is_some());
    }

    #[test]
    fn test_rounds_cannot_be_rerun() {
        let mut orch = TournamentOrchestrator::new(TournamentConfig::default(), pool(), train_set(100)).unwrap();
        let names = orch.pool().names();
        orch.run_round(&names, 1).unwrap();
        let err = orch.run_round(&names, 1).unwrap_err();
        assert!(matches!(err, TournamentError::TournamentIntegrityError(_)));
    }

    #[test]
    fn test_unknown_candidate_is_rejected() {
        let mut orch = TournamentOrchestrator::new(TournamentConfig::default(), pool(), train_set(100)).unwrap();
        let err = orch.run_round(&["nope".to_string()], 1).unwrap_err();
        assert!(matches!(err, TournamentError::TournamentIntegrityError(_)));
        assert_eq!(orch.state().phase(), Phase::Idle);
    }

    #[test]
    fn test_sample_smaller_than_folds() {
        let config = TournamentConfig::default().with_data_fraction(0.05);
        let mut orch = TournamentOrchestrator::new(config, pool(), train_set(40)).unwrap();
        let names = orch.pool().names();
        assert!(matches!(orch.run_round(&names, 1), Err(TournamentError::DataError(_))));
        assert_eq!(orch.state().round_index(), 0);
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!clone.is_cancelled());
    }
}
