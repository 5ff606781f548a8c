//! Model Tournament - Main Entry Point

use clap::Parser;
use model_tournament::cli::{cmd_info, cmd_run, cmd_serve, Cli, Commands, RunOverrides};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "model_tournament=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            target,
            config,
            rounds,
            fraction,
            seed,
            cv_folds,
            primary_metric,
            output_dir,
            index_col,
        } => {
            let overrides = RunOverrides {
                target,
                rounds,
                fraction,
                seed,
                cv_folds,
                primary_metric,
                output_dir,
                index_col,
            };
            // Training is CPU-bound; keep it off the async workers
            tokio::task::spawn_blocking(move || cmd_run(&data, config.as_ref(), &overrides)).await??;
        }
        Commands::Serve { port, host, models_dir } => {
            cmd_serve(host, port, models_dir).await?;
        }
        Commands::Info { data, index_col } => {
            cmd_info(&data, index_col)?;
        }
    }

    Ok(())
}
