// Durable last-seen snapshot, kept as a pretty-printed JSON array.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::PersistError;
use crate::types::Snapshot;

/// What `load` found on disk. Every variant other than `Loaded` means
/// "no prior state".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateLoad {
    Loaded(Snapshot),
    Missing,
    Empty,
    Corrupt(String),
}

impl StateLoad {
    pub fn into_snapshot(self) -> Snapshot {
        match self {
            StateLoad::Loaded(snapshot) => snapshot,
            _ => Snapshot::empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Previous snapshot, or empty when there is none usable.
    pub async fn load(&self) -> Snapshot {
        self.load_detailed().await.into_snapshot()
    }

    pub async fn load_detailed(&self) -> StateLoad {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No previous state, starting fresh");
                return StateLoad::Missing;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "State file unreadable, treating as empty");
                return StateLoad::Corrupt(e.to_string());
            }
        };

        if raw.trim().is_empty() {
            info!(path = %self.path.display(), "State file is empty, starting fresh");
            return StateLoad::Empty;
        }

        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) => {
                info!(path = %self.path.display(), notices = snapshot.len(), "Loaded previous state");
                StateLoad::Loaded(snapshot)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "State file is not a valid snapshot, treating as empty");
                StateLoad::Corrupt(e.to_string())
            }
        }
    }

    /// Replace the stored snapshot. Writes a sibling temp file and renames
    /// it into place so a failed write leaves the old state intact.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        let mut body = serde_json::to_string_pretty(snapshot)?;
        body.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|source| self.io_error(source))?;

        if let Err(source) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.io_error(source));
        }

        info!(path = %self.path.display(), notices = snapshot.len(), "State saved");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
