//! Application configuration management.
//!
//! This module handles loading and saving the console configuration: the
//! backend URL, request timeout, login path, last used email and which
//! credential store to use.
//!
//! Configuration is stored at `~/.config/fizanakara/config.json`. The
//! `FIZANAKARA_API_BASE_URL` environment variable overrides the base URL and
//! `FIZANAKARA_CREDENTIAL_BACKEND` overrides the credential store.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::DEFAULT_LOGIN_PATH;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "fizanakara";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "FIZANAKARA_API_BASE_URL";

/// Environment variable overriding the credential backend
pub const CREDENTIAL_BACKEND_ENV: &str = "FIZANAKARA_CREDENTIAL_BACKEND";

/// Production backend
pub const DEFAULT_API_BASE_URL: &str = "https://fizanakara-application.onrender.com/api";

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    Keyring,
    #[default]
    File,
    Memory,
}

impl CredentialBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" | "keychain" => Some(CredentialBackend::Keyring),
            "file" => Some(CredentialBackend::File),
            "memory" => Some(CredentialBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub login_path: String,
    pub last_email: Option<String>,
    pub credential_backend: CredentialBackend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            last_email: None,
            credential_backend: CredentialBackend::default(),
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_override(std::env::var(BASE_URL_ENV).ok());
        config.apply_backend_override(std::env::var(CREDENTIAL_BACKEND_ENV).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Persist the last login email without writing environment overrides to disk
    pub fn remember_email(email: &str) -> Result<()> {
        let path = Self::config_path()?;
        let mut stored = Self::load_from(&path)?;
        stored.last_email = Some(email.to_string());
        stored.save_to(&path)
    }

    fn apply_env_override(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
    }

    fn apply_backend_override(&mut self, backend: Option<String>) {
        let Some(value) = backend.filter(|b| !b.trim().is_empty()) else {
            return;
        };
        match CredentialBackend::from_str(&value) {
            Some(backend) => self.credential_backend = backend,
            None => warn!(value = %value, "Unknown credential backend, keeping {:?}", self.credential_backend),
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.credential_backend, CredentialBackend::File);
    }

    #[test]
    fn test_save_and_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            last_email: Some("admin@fizanakara.mg".into()),
            credential_backend: CredentialBackend::Memory,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.last_email.as_deref(), Some("admin@fizanakara.mg"));
        assert_eq!(loaded.credential_backend, CredentialBackend::Memory);

        std::fs::write(&path, r#"{"api_base_url": "http://localhost:8080/api"}"#).unwrap();
        let partial = Config::load_from(&path).unwrap();
        assert_eq!(partial.api_base_url, "http://localhost:8080/api");
        assert_eq!(partial.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_env_override(Some("  ".into()));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        config.apply_env_override(Some("http://localhost:3000/api/".into()));
        assert_eq!(config.api_base_url, "http://localhost:3000/api");
    }

    #[test]
    fn test_backend_override() {
        let mut config = Config::default();
        config.apply_backend_override(Some("keychain".into()));
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);
        config.apply_backend_override(Some("disk".into()));
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);
        config.apply_backend_override(Some(" memory ".into()));
        assert_eq!(config.credential_backend, CredentialBackend::Memory);
        config.apply_backend_override(None);
        assert_eq!(config.credential_backend, CredentialBackend::Memory);
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!(CredentialBackend::from_str("File"), Some(CredentialBackend::File));
        assert_eq!(CredentialBackend::from_str("keychain"), Some(CredentialBackend::Keyring));
        assert_eq!(CredentialBackend::from_str("disk"), None);
    }
}
