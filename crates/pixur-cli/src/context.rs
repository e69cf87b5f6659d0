use anyhow::{Context, Result};
use pixur_application::view::PicViewer;
use pixur_application::{AuthService, CommentsService, PicsService};
use pixur_core::config::ClientConfig;
use pixur_infrastructure::{ConfigStorage, FileSessionStore, HttpPixurApi};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Services wired against the configured server and session file.
pub struct AppContext {
    pub config: ClientConfig,
    pub auth: Arc<AuthService>,
    pub pics: Arc<PicsService>,
    pub comments: Arc<CommentsService>,
}

impl AppContext {
    pub fn load(config_path: Option<PathBuf>, url: Option<String>) -> Result<Self> {
        let storage = match config_path {
            Some(path) => ConfigStorage::new(path),
            None => ConfigStorage::new_default().context("Failed to locate config directory")?,
        };
        let mut config = storage.load_effective().context("Failed to load config")?;
        if let Some(url) = url {
            config.base_url = url;
            config.validate()?;
        }
        debug!(base_url = %config.base_url, "Using server");

        let api = Arc::new(HttpPixurApi::from_config(&config)?);
        let store = Arc::new(FileSessionStore::from_config(config.session_file.clone())?);
        let auth = Arc::new(AuthService::new(api.clone(), store));
        let pics = Arc::new(PicsService::from_config(api.clone(), auth.clone(), &config)?);
        let comments = Arc::new(CommentsService::new(api, auth.clone(), pics.clone()));

        Ok(Self {
            config,
            auth,
            pics,
            comments,
        })
    }

    pub fn viewer(&self) -> PicViewer {
        PicViewer::new(self.pics.clone(), self.comments.clone())
    }

    /// Absolute URL of a server-relative path.
    pub fn absolute_url(&self, relative: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            relative.trim_start_matches('/')
        )
    }
}
