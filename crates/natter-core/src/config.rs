//! Application configuration.
//!
//! Endpoints for the three hosted services, loaded from a TOML file at
//! `~/.config/natter/config.toml`. The file is created with the default
//! deployment's endpoints on first run; every endpoint can be overridden
//! through an environment variable.

use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NatterError, Result};

const DEFAULT_AUTH_URL: &str = "https://hkwajydmzojtegdkmwff.auth.ap-south-1.nhost.run/v1";
const DEFAULT_GRAPHQL_URL: &str = "https://hkwajydmzojtegdkmwff.graphql.ap-south-1.nhost.run/v1";
const DEFAULT_WEBHOOK_URL: &str =
    "https://keerthipriyab12372.app.n8n.cloud/webhook/chatbot-webhook";

/// Endpoints of the three hosted services the client talks to.
///
/// All three are plain base URLs; the clients append nothing to
/// `graphql_url` and `webhook_url`, and only fixed route suffixes to
/// `auth_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the identity service's REST surface
    pub auth_url: String,
    /// GraphQL endpoint of the data backend
    pub graphql_url: String,
    /// The automation webhook that produces assistant replies
    pub webhook_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Returns the default config file location
    /// (`<config dir>/natter/config.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory cannot be
    /// determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| NatterError::config("Failed to determine config directory"))?;
        Ok(config_dir.join("natter").join("config.toml"))
    }

    /// Loads the config from `path`, writing the defaults there on first
    /// run.
    ///
    /// # Arguments
    ///
    /// * `path` - The config file location
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if the defaults cannot be written.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Saves the config atomically.
    ///
    /// Writes to a temporary sibling file, syncs it, then renames over
    /// `path` so a crash never leaves a half-written config behind.
    ///
    /// # Arguments
    ///
    /// * `path` - The config file location
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;

        let tmp_path = Self::temp_path(path)?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    /// Applies per-endpoint environment overrides.
    ///
    /// `NATTER_AUTH_URL`, `NATTER_GRAPHQL_URL` and `NATTER_WEBHOOK_URL`
    /// each replace the corresponding file value when set.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("NATTER_AUTH_URL") {
            self.auth_url = url;
        }
        if let Ok(url) = std::env::var("NATTER_GRAPHQL_URL") {
            self.graphql_url = url;
        }
        if let Ok(url) = std::env::var("NATTER_WEBHOOK_URL") {
            self.webhook_url = url;
        }
    }

    /// Loads the effective configuration: default location, defaults on
    /// first run, environment overrides applied last.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = Self::load_or_init(&path)?;
        config.apply_env();
        Ok(config)
    }

    /// Returns the temporary sibling path used for atomic writes.
    fn temp_path(path: &Path) -> Result<PathBuf> {
        let file_name = path
            .file_name()
            .ok_or_else(|| NatterError::config("Config path has no file name"))?;
        Ok(path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_run_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("natter").join("config.toml");

        let config = AppConfig::load_or_init(&path).unwrap();

        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = AppConfig {
            auth_url: "http://localhost:4000/v1".to_string(),
            graphql_url: "http://localhost:8080/v1/graphql".to_string(),
            webhook_url: "http://localhost:5678/webhook/test".to_string(),
        };

        config.save(&path).unwrap();
        let loaded = AppConfig::load_or_init(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        AppConfig::default().save(&path).unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join(".config.toml.tmp").exists());
    }
}
