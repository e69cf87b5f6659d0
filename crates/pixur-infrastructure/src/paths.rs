//! Platform paths for pixur configuration and session files.

use pixur_core::{PixurError, Result};
use std::path::PathBuf;

/// Resolves where pixur keeps its files.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/pixur/
/// ├── config.toml     # ClientConfig
/// └── session.json    # identity, tokens, XSRF token
/// ```
pub struct PixurPaths;

impl PixurPaths {
    /// Returns the pixur configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/pixur/`)
    /// - `Err(PixurError::Config)`: The platform has no config directory
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("pixur"))
            .ok_or_else(|| PixurError::config("Cannot find config directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the default session file.
    ///
    /// The file holds live tokens; it is written with mode 600 on Unix.
    pub fn session_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("session.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_in_config_dir() {
        // Headless CI machines may lack a config dir; nothing to check then.
        let Ok(dir) = PixurPaths::config_dir() else {
            return;
        };
        assert!(dir.ends_with("pixur"));
        assert_eq!(PixurPaths::config_file().unwrap(), dir.join("config.toml"));
        assert_eq!(PixurPaths::session_file().unwrap(), dir.join("session.json"));
    }
}
