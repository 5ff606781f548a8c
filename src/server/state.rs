//! Loaded model and scaler shared across handlers

use crate::data::StandardScaler;
use crate::storage::{load_json, ArtifactStore, LocalArtifactStore, MODEL_ARTIFACT, SCALER_ARTIFACT};
use crate::training::TrainedModel;
use tracing::{info, warn};

use super::ServerConfig;

/// Read-only after startup. Either artifact may be missing, in which case
/// `/predict` answers with a 500.
pub struct AppState {
    pub config: ServerConfig,
    pub model: Option<TrainedModel>,
    pub scaler: Option<StandardScaler>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig, model: Option<TrainedModel>, scaler: Option<StandardScaler>) -> Self {
        Self {
            config,
            model,
            scaler,
            started_at: chrono::Utc::now(),
        }
    }

    /// Load artifacts from `config.models_dir`, logging rather than failing
    /// when they are absent or unreadable
    pub fn load(config: ServerConfig) -> Self {
        let store = LocalArtifactStore::new(&config.models_dir);

        let model = match store.load(MODEL_ARTIFACT).and_then(|bytes| TrainedModel::from_bytes(&bytes)) {
            Ok(model) => {
                info!(path = %store.path_for(MODEL_ARTIFACT).display(), kind = model.kind(), "Model loaded");
                Some(model)
            }
            Err(e) => {
                warn!(error = %e, "Could not load model");
                None
            }
        };

        let scaler = match load_json::<StandardScaler>(&store, SCALER_ARTIFACT) {
            Ok(scaler) => {
                info!(
                    path = %store.path_for(SCALER_ARTIFACT).display(),
                    features = scaler.n_features(),
                    "Scaler loaded"
                );
                Some(scaler)
            }
            Err(e) => {
                warn!(error = %e, "Could not load scaler");
                None
            }
        };

        Self::new(config, model, scaler)
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some() && self.scaler.is_some()
    }

    /// Feature names in the order the scaler was fitted on
    pub fn expected_features(&self) -> &[String] {
        self.scaler.as_ref().map_or(&[], |s| s.feature_names())
    }
}
