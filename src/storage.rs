//! Artifact persistence
//!
//! Models and the scaler are stored as opaque named blobs. The local backend
//! keeps one JSON file per artifact under a base directory.

use crate::error::{Result, TournamentError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Artifact name of the retrained winner
pub const MODEL_ARTIFACT: &str = "final_model";
/// Artifact name of the scaler fitted on the training split
pub const SCALER_ARTIFACT: &str = "scaler";

/// Save/load of named blobs
pub trait ArtifactStore: Send + Sync {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<()>;

    fn load(&self, name: &str) -> Result<Vec<u8>>;

    fn exists(&self, name: &str) -> bool;
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') || name == "." || name == ".." {
        return Err(TournamentError::PersistenceError(format!(
            "invalid artifact name '{}'",
            name
        )));
    }
    Ok(())
}

/// Serialize `value` as JSON and store it under `name`
pub fn save_json<T: Serialize>(store: &dyn ArtifactStore, name: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    store.save(name, &bytes)
}

/// Load and decode a JSON artifact
pub fn load_json<T: DeserializeOwned>(store: &dyn ArtifactStore, name: &str) -> Result<T> {
    let bytes = store.load(name)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        TournamentError::PersistenceError(format!("cannot decode artifact '{}': {}", name, e))
    })
}

/// Local file system store
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    base_dir: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", name))
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        check_name(name)?;
        fs::create_dir_all(&self.base_dir).map_err(|e| {
            TournamentError::PersistenceError(format!(
                "failed to create {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        // Write then rename so a reader never sees a half-written artifact
        let path = self.path_for(name);
        let tmp = path.with_extension("json.tmp");
        if let Err(e) = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(TournamentError::PersistenceError(format!(
                "failed to write {}: {}",
                path.display(),
                e
            )));
        }

        debug!(artifact = name, path = %path.display(), bytes = bytes.len(), "Saved artifact");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Vec<u8>> {
        check_name(name)?;
        let path = self.path_for(name);
        fs::read(&path).map_err(|e| {
            TournamentError::PersistenceError(format!("failed to read {}: {}", path.display(), e))
        })
    }

    fn exists(&self, name: &str) -> bool {
        check_name(name).is_ok() && self.path_for(name).is_file()
    }
}

/// In-process store, handy for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.blobs.lock() {
            Ok(blobs) => blobs.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        };
        names.sort();
        names
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        check_name(name)?;
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| TournamentError::PersistenceError("artifact store lock poisoned".to_string()))?;
        blobs.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Vec<u8>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| TournamentError::PersistenceError("artifact store lock poisoned".to_string()))?;
        blobs
            .get(name)
            .cloned()
            .ok_or_else(|| TournamentError::PersistenceError(format!("artifact '{}' not found", name)))
    }

    fn exists(&self, name: &str) -> bool {
        self.blobs.lock().map(|b| b.contains_key(name)).unwrap_or(false)
    }
}
