//! learnloop configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::session::FileTokenStore;

/// Environment variable overriding the service base URL
pub const API_URL_ENV: &str = "LEARNLOOP_API_URL";

/// Environment variable overriding the token file location
pub const TOKEN_FILE_ENV: &str = "LEARNLOOP_TOKEN_FILE";

/// Main learnloop configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Recommendation service connection
    pub api: ApiConfig,

    /// Where the session token lives
    pub storage: StorageConfig,

    /// Dashboard settings
    pub tui: TuiConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .learnloop.yml
        let local_config = PathBuf::from(".learnloop.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/learnloop/learnloop.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("learnloop").join("learnloop.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed: a broken config is reported by the full load.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates: Vec<PathBuf> = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".learnloop.yml")];
                if let Some(dir) = dirs::config_dir() {
                    paths.push(dir.join("learnloop").join("learnloop.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply environment overrides (`LEARNLOOP_API_URL`, `LEARNLOOP_TOKEN_FILE`)
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(API_URL_ENV).ok().as_deref(),
            std::env::var(TOKEN_FILE_ENV).ok().map(PathBuf::from),
        );
    }

    /// Apply explicit overrides; blank values are ignored
    pub fn apply_overrides(&mut self, api_url: Option<&str>, token_file: Option<PathBuf>) {
        if let Some(url) = api_url.map(str::trim).filter(|u| !u.is_empty()) {
            tracing::debug!(%url, "Config::apply_overrides: api url");
            self.api.base_url = url.to_string();
        }
        if let Some(path) = token_file.filter(|p| !p.as_os_str().is_empty()) {
            tracing::debug!(path = %path.display(), "Config::apply_overrides: token file");
            self.storage.token_file = path;
        }
    }
}

/// Recommendation service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Service base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Token storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// File holding the bearer token
    #[serde(rename = "token-file")]
    pub token_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            token_file: FileTokenStore::default_path(),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Event poll interval in milliseconds
    #[serde(rename = "tick-rate-ms")]
    pub tick_rate_ms: u64,

    /// Number of recent interactions shown
    #[serde(rename = "history-limit")]
    pub history_limit: usize,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 50,
            history_limit: 10,
        }
    }
}
