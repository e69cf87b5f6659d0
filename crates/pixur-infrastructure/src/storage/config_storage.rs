//! TOML-backed client configuration.

use super::atomic_file::{AtomicFile, FileFormat};
use crate::paths::PixurPaths;
use pixur_core::Result;
use pixur_core::config::ClientConfig;
use std::path::PathBuf;
use tracing::{debug, info};

/// Reads `config.toml`, writing the defaults on first use.
pub struct ConfigStorage {
    file: AtomicFile<ClientConfig>,
}

impl ConfigStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicFile::new(path, FileFormat::Toml),
        }
    }

    /// Uses the platform config file (`~/.config/pixur/config.toml`).
    pub fn new_default() -> Result<Self> {
        Ok(Self::new(PixurPaths::config_file()?))
    }

    /// Loads the stored config, creating the file with defaults if missing.
    ///
    /// Environment overrides are not applied here; see [`Self::load_effective`].
    pub fn load_or_create(&self) -> Result<ClientConfig> {
        if let Some(config) = self.file.load()? {
            debug!(path = %self.file.path().display(), "Loaded client config");
            return Ok(config);
        }

        // Another process may create the file first; keep whatever it wrote.
        let config = self
            .file
            .update(ClientConfig::default(), |config| Ok(config.clone()))?;
        info!(path = %self.file.path().display(), "Created default client config");
        Ok(config)
    }

    /// Loads the config with environment overrides applied and validated.
    pub fn load_effective(&self) -> Result<ClientConfig> {
        let config = self.load_or_create()?.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &ClientConfig) -> Result<()> {
        config.validate()?;
        self.file.save(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_load_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let storage = ConfigStorage::new(path.clone());

        let config = storage.load_or_create().unwrap();

        assert_eq!(config, ClientConfig::default());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("base_url = \"http://localhost:8888\""));
    }

    #[test]
    fn test_saved_values_survive_reload() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::new(temp_dir.path().join("config.toml"));

        let config = ClientConfig {
            base_url: "https://pix.example".to_string(),
            pic_cache_capacity: 16,
            ..ClientConfig::default()
        };
        storage.save(&config).unwrap();

        assert_eq!(storage.load_or_create().unwrap(), config);
    }

    #[test]
    fn test_save_rejects_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConfigStorage::new(temp_dir.path().join("config.toml"));

        let config = ClientConfig {
            page_cache_capacity: 0,
            ..ClientConfig::default()
        };
        assert!(storage.save(&config).is_err());
    }
}
