//! Command-line interface
//!
//! `run` drives a full tournament from a CSV file, `serve` starts the
//! inference server and `info` summarises a dataset.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::data::{load_dataframe, DataPartitioner, DatasetLoader};
use crate::finalize::FinalTrainer;
use crate::report::{TournamentReport, REPORT_FILE};
use crate::server::{run_server, ServerConfig};
use crate::storage::{ArtifactStore, LocalArtifactStore};
use crate::tournament::{CandidatePool, TournamentConfig, TournamentOrchestrator};
use crate::training::Metric;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "model-tournament")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Select a regression model by elimination tournament")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Partition data, run the tournament, retrain and persist the winner
    Run {
        /// Input data file (CSV, JSON, or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long)]
        target: Option<String>,

        /// Tournament config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of rounds
        #[arg(long)]
        rounds: Option<usize>,

        /// Fraction of training rows sampled each round
        #[arg(long)]
        fraction: Option<f64>,

        /// Base random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Number of cross-validation folds
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Ranking metric (rmse, r2, mae, mse)
        #[arg(long, value_parser = Metric::parse)]
        primary_metric: Option<Metric>,

        /// Directory for the model, scaler and report
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Treat the first column as a row index
        #[arg(long)]
        index_col: bool,
    },

    /// Start the inference server
    Serve {
        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host
        #[arg(long)]
        host: Option<String>,

        /// Directory holding the persisted model and scaler
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },

    /// Show data information
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Treat the first column as a row index
        #[arg(long)]
        index_col: bool,
    },
}

/// Flag overrides for `run`
#[derive(Debug, Default, Clone)]
pub struct RunOverrides {
    pub target: Option<String>,
    pub rounds: Option<usize>,
    pub fraction: Option<f64>,
    pub seed: Option<u64>,
    pub cv_folds: Option<usize>,
    pub primary_metric: Option<Metric>,
    pub output_dir: Option<PathBuf>,
    pub index_col: bool,
}

impl RunOverrides {
    /// Apply flags on top of a file or default config
    pub fn apply(&self, mut config: TournamentConfig) -> TournamentConfig {
        if let Some(target) = &self.target {
            config.target_column = target.clone();
        }
        if let Some(rounds) = self.rounds {
            config.tournament_rounds = rounds;
        }
        if let Some(fraction) = self.fraction {
            config.tournament_data_fraction = fraction;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(folds) = self.cv_folds {
            config.cv_folds = folds;
        }
        if let Some(metric) = self.primary_metric {
            config.primary_metric = metric;
            if !config.metrics.contains(&metric) {
                config.metrics.push(metric);
            }
        }
        if let Some(dir) = &self.output_dir {
            config.artifacts_dir = dir.clone();
        }
        if self.index_col {
            config.index_column = true;
        }
        config
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(data_path: &PathBuf, config_path: Option<&PathBuf>, overrides: &RunOverrides) -> anyhow::Result<()> {
    section("Tournament");
    let started_at = chrono::Utc::now();

    let base = match config_path {
        Some(path) => TournamentConfig::from_json_file(path)?,
        None => TournamentConfig::default(),
    };
    let config = overrides.apply(base);
    config.validate()?;

    step_run("Loading data");
    let start = Instant::now();
    let dataset = DatasetLoader::new(config.target_column.clone())
        .with_drop_columns(config.drop_columns.clone())
        .with_index_column(config.index_column)
        .load(data_path)?;
    step_done(&format!(
        "{} rows × {} features in {:?}",
        dataset.n_rows(),
        dataset.n_features(),
        start.elapsed()
    ));

    step_run("Partitioning");
    let data = DataPartitioner::new(config.test_fraction, config.seed)
        .with_strict_scaling(config.strict_scaling)
        .partition(&dataset)?;
    step_done(&format!("{} train / {} test", data.train.n_rows(), data.test.n_rows()));

    std::fs::create_dir_all(&config.artifacts_dir)?;
    let store: Arc<dyn ArtifactStore> = Arc::new(LocalArtifactStore::new(&config.artifacts_dir));

    let pool = CandidatePool::standard(config.seed);
    println!("  {} {} candidates", muted("pool"), pool.len());

    step_run("Running tournament");
    let start = Instant::now();
    let mut orchestrator = TournamentOrchestrator::new(config.clone(), pool, data.train_scaled.clone())?;
    if config.persist_round_checkpoints {
        orchestrator = orchestrator.with_checkpoint_store(Arc::clone(&store));
    }
    let outcome = orchestrator.run_tournament()?;
    step_done(&format!("{} rounds in {:?}", outcome.rounds_run, start.elapsed()));
    if outcome.budget_exhausted {
        println!(
            "  {} round budget exhausted, taking the last round's leader",
            "note".yellow()
        );
    }

    step_run(&format!("Retraining {}", outcome.winner.cyan()));
    let state = orchestrator.into_state();
    let final_outcome = FinalTrainer::new(Arc::clone(&store)).finalize(&state, &data)?;
    step_done(&format!("saved to {}", config.artifacts_dir.display()));

    let report = TournamentReport::build(&config, &state, Some(&final_outcome), started_at);
    let report_path = config.artifacts_dir.join(REPORT_FILE);
    report.save_json(&report_path)?;

    println!();
    for line in report.render_text().lines() {
        println!("  {}", line);
    }
    println!();
    println!(
        "  {} {} {} {:.4} {} {:.4}",
        ok("winner"),
        final_outcome.winner.white().bold(),
        muted("rmse"),
        final_outcome.test_rmse(),
        muted("r2"),
        final_outcome.test_r2()
    );
    println!("  {} {}", muted("report"), report_path.display());
    println!();
    Ok(())
}

pub async fn cmd_serve(host: Option<String>, port: Option<u16>, models_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dir) = models_dir {
        config.models_dir = dir;
    }

    section("Serve");
    println!("  {:<12} http://{}:{}", muted("Address"), config.host, config.port);
    println!("  {:<12} {}", muted("Models"), config.models_dir.display());
    println!();

    run_server(config).await
}

pub fn cmd_info(data_path: &PathBuf, index_col: bool) -> anyhow::Result<()> {
    section("Data Info");

    let mut df = load_dataframe(data_path)?;
    let index_name: Option<String> = df.get_column_names().first().map(|s| s.to_string());
    if let (true, Some(name)) = (index_col, index_name) {
        df = df.drop(&name)?;
    }

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!("  {:<12} {:.2} MB", muted("Memory"), df.estimated_size() as f64 / 1024.0 / 1024.0);
    println!();

    println!("  {:<20} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(50)));

    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            col.name(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "model-tournament",
            "run",
            "--data",
            "air.csv",
            "--rounds",
            "5",
            "--primary-metric",
            "r2",
            "--index-col",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { data, rounds, primary_metric, index_col, .. } => {
                assert_eq!(data, PathBuf::from("air.csv"));
                assert_eq!(rounds, Some(5));
                assert_eq!(primary_metric, Some(Metric::R2));
                assert!(index_col);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_index_col_defaults_off() {
        let cli = Cli::try_parse_from(["model-tournament", "info", "--data", "air.csv"]).unwrap();
        match cli.command {
            Commands::Info { index_col, .. } => assert!(!index_col),
            _ => panic!("expected info"),
        }
        let config = RunOverrides::default().apply(TournamentConfig::default());
        assert!(!config.index_column);
    }

    #[test]
    fn test_cli_rejects_unknown_metric() {
        let parsed = Cli::try_parse_from(["model-tournament", "run", "--data", "a.csv", "--primary-metric", "mape"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_overrides_win_over_config() {
        let overrides = RunOverrides {
            target: Some("co2".to_string()),
            rounds: Some(7),
            primary_metric: Some(Metric::Mae),
            index_col: true,
            ..Default::default()
        };
        let config = overrides.apply(TournamentConfig::default());
        assert!(config.index_column);

        assert_eq!(config.target_column, "co2");
        assert_eq!(config.tournament_rounds, 7);
        assert_eq!(config.primary_metric, Metric::Mae);
        assert!(config.metrics.contains(&Metric::Mae));
        assert!(config.validate().is_ok());
    }
}
