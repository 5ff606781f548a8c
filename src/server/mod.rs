//! Inference server
//!
//! Loads the persisted winner and scaler and serves single predictions
//! over HTTP.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::InferenceError;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub models_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            models_dir: std::env::var("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./models")),
        }
    }
}

async fn shutdown_signal(started_at: chrono::DateTime<chrono::Utc>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not install ctrl+c handler, shutdown signal disabled");
        std::future::pending::<()>().await;
    }
    let uptime = chrono::Utc::now().signed_duration_since(started_at);
    info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping server gracefully");
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(models_dir = %config.models_dir.display(), "Loading inference artifacts");

    let state = Arc::new(AppState::load(config.clone()));
    if !state.is_ready() {
        warn!("Serving without a complete model, /predict will return 500 until artifacts are present");
    }
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        pid = std::process::id(),
        started_at = %start_time.to_rfc3339(),
        "Inference server listening (press ctrl+c to stop)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(start_time))
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        if std::env::var("API_PORT").is_err() {
            assert_eq!(config.port, 5000);
        }
        if std::env::var("MODELS_DIR").is_err() {
            assert_eq!(config.models_dir, PathBuf::from("./models"));
        }
    }
}
