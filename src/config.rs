// MediaManager Configuration Module
// Persistent application settings stored as JSON next to the session record

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::providers::github::DEFAULT_API_BASE;

pub const CONFIG_FILENAME: &str = "config.json";
pub const DEFAULT_RAW_HOST: &str = "raw.githubusercontent.com";
pub const DEFAULT_BRANCH: &str = "main";
/// Pause between a fully completed upload batch and the catalog refresh
pub const DEFAULT_COMPLETION_DELAY_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// REST API root (GitHub or GitHub Enterprise)
    pub api_base_url: String,
    /// Host serving raw file content, used for previews and embed codes
    pub raw_host: String,
    /// Branch used when login does not name one
    pub default_branch: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Delay before a completed upload batch triggers a refresh
    pub completion_delay_ms: u64,
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            raw_host: DEFAULT_RAW_HOST.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            request_timeout_secs: 30,
            completion_delay_ms: DEFAULT_COMPLETION_DELAY_MS,
            user_agent: concat!("MediaManager/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }
}

/// Directory holding the config file and the session record
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("mediamanager")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILENAME)
}

/// Load configuration from disk, falling back to defaults
pub fn load_config(path: &Path) -> AppConfig {
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse config {:?}: {}", path, e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config {:?}: {}", path, e);
            }
        }
    }

    AppConfig::default()
}

/// Save configuration to disk
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Serialization(e.to_string()))?;
    fs::write(path, content)?;

    tracing::info!("Config saved to {:?}", path);
    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let api = url::Url::parse(&config.api_base_url)
        .map_err(|e| ConfigError::Invalid(format!("api_base_url: {}", e)))?;
    if api.scheme() != "https" && api.scheme() != "http" {
        return Err(ConfigError::Invalid("api_base_url must be an http(s) URL".to_string()));
    }

    // raw_host is spliced into https://{raw_host}/..., so it must be a bare host
    if config.raw_host.is_empty() || config.raw_host.contains('/') || config.raw_host.contains(':') {
        return Err(ConfigError::Invalid("raw_host must be a bare host name".to_string()));
    }

    if config.default_branch.trim().is_empty() {
        return Err(ConfigError::Invalid("default_branch cannot be empty".to_string()));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("request_timeout_secs must be positive".to_string()));
    }

    Ok(())
}
