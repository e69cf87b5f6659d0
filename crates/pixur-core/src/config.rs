use crate::cache::{DEFAULT_PAGE_CACHE_CAPACITY, DEFAULT_PIC_CACHE_CAPACITY};
use crate::error::{PixurError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8888";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_URL: &str = "PIXUR_URL";
/// Environment variable overriding [`ClientConfig::session_file`].
pub const ENV_SESSION_FILE: &str = "PIXUR_SESSION_FILE";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_page_cache_capacity() -> usize {
    DEFAULT_PAGE_CACHE_CAPACITY
}

fn default_pic_cache_capacity() -> usize {
    DEFAULT_PIC_CACHE_CAPACITY
}

/// Client settings, read from `config.toml`.
///
/// Every field has a default so a partial (or missing) file is fine.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_page_cache_capacity")]
    pub page_cache_capacity: usize,
    #[serde(default = "default_pic_cache_capacity")]
    pub pic_cache_capacity: usize,
    /// Session file location. `None` means the platform default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            page_cache_capacity: default_page_cache_capacity(),
            pic_cache_capacity: default_pic_cache_capacity(),
            session_file: None,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Applies overrides using `lookup` in place of the environment.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(path) = lookup(ENV_SESSION_FILE).filter(|v| !v.is_empty()) {
            self.session_file = Some(PathBuf::from(path));
        }
        self
    }

    /// Checks values that would otherwise fail later in confusing ways.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(PixurError::config(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(PixurError::config("request_timeout_secs must be positive"));
        }
        if self.page_cache_capacity == 0 || self.pic_cache_capacity == 0 {
            return Err(PixurError::config("cache capacities must be positive"));
        }
        Ok(())
    }
}
