//! File-backed session store.

use crate::paths::PixurPaths;
use crate::storage::{AtomicFile, FileFormat};
use pixur_core::auth::{SessionData, SessionStore};
use pixur_core::{PixurError, Result};
use std::path::PathBuf;
use tracing::debug;

/// Keeps [`SessionData`] in a JSON file readable only by its owner.
///
/// File work runs on the blocking pool so callers on the async runtime are
/// never stalled by disk I/O.
#[derive(Clone)]
pub struct FileSessionStore {
    file: AtomicFile<SessionData>,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicFile::new(path, FileFormat::Json).private(),
        }
    }

    /// Uses `path` when given, otherwise `~/.config/pixur/session.json`.
    pub fn from_config(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Ok(Self::new(path)),
            None => Ok(Self::new(PixurPaths::session_file()?)),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }
}

#[async_trait::async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<SessionData> {
        let file = self.file.clone();
        let loaded = tokio::task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| PixurError::internal(format!("Session load task failed: {}", e)))??;
        Ok(loaded.unwrap_or_default())
    }

    async fn save(&self, session: &SessionData) -> Result<()> {
        let file = self.file.clone();
        let session = session.clone();
        tokio::task::spawn_blocking(move || file.save(&session))
            .await
            .map_err(|e| PixurError::internal(format!("Session save task failed: {}", e)))??;
        debug!(path = %self.file.path().display(), "Saved session");
        Ok(())
    }
}
