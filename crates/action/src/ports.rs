//! Outbound ports for action side effects.
//!
//! These are the narrow contracts the delivery actions rely on; the
//! composition root provides concrete implementations wired from
//! deployment configuration, tests provide mocks.

use async_trait::async_trait;

/// Sends a message to one chat.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> crate::Result<()>;
}

/// Submits an offline-download task to a remote service.
#[async_trait]
pub trait OfflineDownloader: Send + Sync {
    /// Returns an implementation-defined task identifier.
    async fn add_task(&self, file_url: &str, save_path: &str) -> crate::Result<String>;
}
