//! Configuration for the BKeep CLI
//!
//! Loaded from `<config_dir>/bkeep/config.toml` (or `--config`), then
//! overridden by environment variables, a `.env` file included.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::import::reencode::FILTERED_FILE_NAME;

pub const ENV_API_URL: &str = "BKEEP_API_URL";
pub const ENV_API_TOKEN: &str = "BKEEP_API_TOKEN";
pub const ENV_TENANT_ID: &str = "BKEEP_TENANT_ID";
pub const ENV_POLL_INTERVAL_MS: &str = "BKEEP_POLL_INTERVAL_MS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub tenant_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api/v1".to_string(),
            token: None,
            tenant_id: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Delay between progress checks for queued imports
    pub poll_interval_ms: u64,
    /// Name given to the re-encoded partial upload
    pub filtered_file_name: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1500,
            filtered_file_name: FILTERED_FILE_NAME.to_string(),
        }
    }
}

impl ImportConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bkeep").join("config.toml"))
    }

    /// Load config from `path` (or the default location) and apply env overrides.
    ///
    /// A missing file is not an error; an explicit path that is missing is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }

    /// Override fields from environment lookups
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(token) = lookup(ENV_API_TOKEN) {
            self.api.token = Some(token);
        }
        if let Some(tenant) = lookup(ENV_TENANT_ID) {
            self.api.tenant_id = Some(tenant);
        }
        if let Some(interval) = lookup(ENV_POLL_INTERVAL_MS) {
            match interval.parse() {
                Ok(ms) => self.import.poll_interval_ms = ms,
                Err(_) => log::warn!("Ignoring invalid {}: {}", ENV_POLL_INTERVAL_MS, interval),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.import.poll_interval_ms, 1500);
        assert_eq!(config.import.filtered_file_name, "filtered_accounts.xlsx");
        assert!(config.api.token.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::parse(
            r#"
            [api]
            base_url = "https://api.bkeep.example/v1"
            tenant_id = "tenant-42"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://api.bkeep.example/v1");
        assert_eq!(config.api.tenant_id.as_deref(), Some("tenant-42"));
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.import.poll_interval_ms, 1500);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_TOKEN, "secret"),
            (ENV_POLL_INTERVAL_MS, "250"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.import.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_interval_is_ignored() {
        let mut config = Config::default();
        config.apply_env(|k| (k == ENV_POLL_INTERVAL_MS).then(|| "soon".to_string()));
        assert_eq!(config.import.poll_interval_ms, 1500);
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("missing.toml")));
        assert!(result.is_err());
    }
}
