//! Subscription entity and per-subscription dynamic configuration.
//!
//! A subscription binds one spider to zero or more delivery actions, a
//! cron schedule, and keyword filters. Its `name` doubles as the
//! scheduler job id, so renaming is always remove-then-re-add. The
//! persisted form carries dynamic configuration only; deployment-level
//! static configuration is re-derived from the config file at load time.

use serde::{Deserialize, Serialize};

use crate::capability::{ActionKind, SpiderKind};
use crate::error::{DomainError, DomainResult};

/// One monitoring task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier, also the scheduler job id.
    pub name: String,
    /// Six-field cron expression (seconds granularity).
    pub cron: String,
    pub spider: SpiderConfig,
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub enable_proxy: bool,
    /// Allow patterns: when non-empty, only records matching at least one
    /// are kept. Regex, matched against title and content.
    #[serde(default)]
    pub white_keywords: Vec<String>,
    /// Deny patterns: records matching any are dropped. Deny overrides
    /// allow.
    #[serde(default)]
    pub black_keywords: Vec<String>,
}

impl Subscription {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::Validation(
                "subscription name must not be empty".to_string(),
            ));
        }
        // The name becomes a file name under the data directory.
        if self.name.contains(['/', '\\']) || self.name.contains("..") {
            return Err(DomainError::Validation(
                "subscription name must not contain path separators".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-subscription spider configuration, tagged by spider name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum SpiderConfig {
    Rss {
        url: String,
    },
    Mikan {
        url: String,
        #[serde(default)]
        category: Option<String>,
    },
    SslCheck {
        #[serde(default)]
        domains: Vec<String>,
        /// Days-to-expiry thresholds that trigger a notification.
        #[serde(default = "default_expired_days")]
        expired_days: Vec<i64>,
    },
}

impl SpiderConfig {
    pub fn kind(&self) -> SpiderKind {
        match self {
            SpiderConfig::Rss { .. } => SpiderKind::Rss,
            SpiderConfig::Mikan { .. } => SpiderKind::Mikan,
            SpiderConfig::SslCheck { .. } => SpiderKind::SslCheck,
        }
    }
}

/// Per-subscription action configuration, tagged by action name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum ActionConfig {
    ChatPush {
        #[serde(default)]
        chat_ids: Vec<i64>,
    },
    OfflineDownload {
        /// Chats that receive the delivery summary.
        #[serde(default)]
        chat_ids: Vec<i64>,
    },
}

impl ActionConfig {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionConfig::ChatPush { .. } => ActionKind::ChatPush,
            ActionConfig::OfflineDownload { .. } => ActionKind::OfflineDownload,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_expired_days() -> Vec<i64> {
    vec![30, 15, 7, 3, 1]
}
