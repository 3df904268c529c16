//! Concrete implementations of the action ports.
//!
//! The action crate only knows the narrow [`action::ChatTransport`] and
//! [`action::OfflineDownloader`] traits; the real Telegram and
//! downloader HTTP clients live here, wired from deployment config.
//! Unconfigured ports get null implementations that log and drop, so a
//! partial deployment degrades instead of failing.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use action::{ActionContext, ActionError, ChatTransport, OfflineDownloader};
use fetch::HttpClient;

use crate::config::Config;

/// Telegram bot API chat transport.
pub struct TelegramChat {
    api_url: String,
    bot_token: String,
    proxy: Option<String>,
    client: HttpClient,
}

impl TelegramChat {
    pub fn new(api_url: String, bot_token: String, proxy: Option<String>) -> Self {
        Self {
            api_url,
            bot_token,
            proxy,
            client: HttpClient::new(),
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramChat {
    async fn send_message(&self, chat_id: i64, text: &str) -> action::Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        let resp = self
            .client
            .post_json(&url, &body, self.proxy.as_deref())
            .await
            .map_err(|e| ActionError::Transport(e.to_string()))?;
        if !resp.is_success() {
            return Err(ActionError::Transport(format!(
                "sendMessage returned {}: {}",
                resp.status_code, resp.body
            )));
        }
        Ok(())
    }
}

/// Offline download service speaking a plain JSON task-submission API.
pub struct HttpDownloader {
    api_url: String,
    client: HttpClient,
}

impl HttpDownloader {
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            client: HttpClient::new(),
        }
    }
}

#[async_trait]
impl OfflineDownloader for HttpDownloader {
    async fn add_task(&self, file_url: &str, save_path: &str) -> action::Result<String> {
        let body = json!({
            "url": file_url,
            "save_path": save_path,
        });
        let resp = self
            .client
            .post_json(&self.api_url, &body, None)
            .await
            .map_err(|e| ActionError::Downloader(e.to_string()))?;
        if !resp.is_success() {
            return Err(ActionError::Downloader(format!(
                "task submission returned {}: {}",
                resp.status_code, resp.body
            )));
        }
        Ok(resp.body)
    }
}

/// Stand-in for a chat transport when no bot token is configured.
pub struct NullChat;

#[async_trait]
impl ChatTransport for NullChat {
    async fn send_message(&self, chat_id: i64, _text: &str) -> action::Result<()> {
        tracing::warn!(
            "No chat transport configured, dropping message for chat {}",
            chat_id
        );
        Ok(())
    }
}

/// Stand-in for a downloader when no endpoint is configured.
pub struct NullDownloader;

#[async_trait]
impl OfflineDownloader for NullDownloader {
    async fn add_task(&self, file_url: &str, _save_path: &str) -> action::Result<String> {
        tracing::warn!(
            "No downloader configured, dropping task for {}",
            file_url
        );
        Ok(String::new())
    }
}

/// Wire the action collaborators from deployment config.
pub fn build_action_context(config: &Config) -> ActionContext {
    let chat: Arc<dyn ChatTransport> = match &config.chat.bot_token {
        Some(token) => Arc::new(TelegramChat::new(
            config.chat.api_url.clone(),
            token.clone(),
            config.proxy.clone(),
        )),
        None => Arc::new(NullChat),
    };

    let downloader: Arc<dyn OfflineDownloader> = match &config.downloader.api_url {
        Some(api_url) => Arc::new(HttpDownloader::new(api_url.clone())),
        None => Arc::new(NullDownloader),
    };

    ActionContext {
        chat,
        downloader,
        save_root_path: config.downloader.save_root_path.clone(),
    }
}
