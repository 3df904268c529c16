//! Deployment configuration.
//!
//! Static, deployment-wide settings loaded once at startup from a TOML
//! file. These are deliberately kept out of the persisted subscription
//! list: subscriptions carry dynamic configuration only and static
//! values are re-derived from here on every load.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for content history and the subscription list.
    pub data_path: String,
    /// Outbound proxy (host:port) used by subscriptions with
    /// `enable_proxy` set.
    pub proxy: Option<String>,
    pub chat: ChatConfig,
    pub downloader: DownloaderConfig,
}

/// Chat transport settings (Telegram bot API).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Bot token; when unset, chat pushes are logged and dropped.
    pub bot_token: Option<String>,
    pub api_url: String,
}

/// Offline downloader settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Task-submission endpoint; when unset, download triggers are
    /// logged and dropped.
    pub api_url: Option<String>,
    pub save_root_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: "data".to_string(),
            proxy: None,
            chat: ChatConfig::default(),
            downloader: DownloaderConfig::default(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            save_root_path: "/downloads".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file; a missing file yields the
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
