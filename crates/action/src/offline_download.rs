//! Offline-download delivery.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use domain::{ActionKind, Record, Subscription};

use crate::error::ActionError;
use crate::ports::{ChatTransport, OfflineDownloader};
use crate::traits::Action;

/// Submits each record's download request to the offline downloader,
/// then pushes a delivery summary to the configured chats. Submission
/// failures go into the summary instead of aborting the batch.
pub struct OfflineDownloadAction {
    chat_ids: Vec<i64>,
    downloader: Arc<dyn OfflineDownloader>,
    transport: Arc<dyn ChatTransport>,
    save_root_path: String,
}

impl OfflineDownloadAction {
    pub fn new(
        chat_ids: Vec<i64>,
        downloader: Arc<dyn OfflineDownloader>,
        transport: Arc<dyn ChatTransport>,
        save_root_path: String,
    ) -> Self {
        Self {
            chat_ids,
            downloader,
            transport,
            save_root_path,
        }
    }

    fn full_save_path(&self, relative: &str) -> String {
        format!("{}/{}", self.save_root_path, relative).replace("//", "/")
    }
}

#[async_trait]
impl Action for OfflineDownloadAction {
    fn kind(&self) -> ActionKind {
        ActionKind::OfflineDownload
    }

    async fn execute(&self, records: &[Record], subscription: &Subscription) -> crate::Result<()> {
        let mut summary = Vec::new();
        for record in records {
            let Some(request) = record.download_request() else {
                tracing::warn!("Record {} has no downloadable payload, skipping", record.id);
                continue;
            };
            let save_path = self.full_save_path(&request.save_path);
            let title = record.title.as_deref().unwrap_or(&record.id);
            tracing::debug!("Offline download {} -> {}", request.file_url, save_path);

            match self.downloader.add_task(&request.file_url, &save_path).await {
                Ok(task_id) => {
                    tracing::debug!("Created offline task {}", task_id);
                    summary.push(format!(
                        "<b>{title}</b>\n<code>{}</code>\nsaved to: {save_path}",
                        request.file_url
                    ));
                }
                Err(e) => {
                    tracing::warn!("Offline task for {} failed: {}", record.id, e);
                    summary.push(format!(
                        "<b>{title}</b>\n<code>{}</code>\nfailed: {e}",
                        request.file_url
                    ));
                }
            }
        }
        if summary.is_empty() {
            return Ok(());
        }

        let message = format!(
            "<i>Offline download</i>\n\n{}",
            summary.join("\n----------\n")
        );
        let sends = self.chat_ids.iter().map(|chat_id| {
            let transport = Arc::clone(&self.transport);
            let message = message.clone();
            let chat_id = *chat_id;
            async move { transport.send_message(chat_id, &message).await }
        });

        let mut failed = 0usize;
        for result in join_all(sends).await {
            if let Err(e) = result {
                failed += 1;
                tracing::warn!(
                    "Offline download summary for {} failed: {}",
                    subscription.name,
                    e
                );
            }
        }
        if failed > 0 {
            return Err(ActionError::Transport(format!(
                "{failed} summary sends failed"
            )));
        }
        Ok(())
    }
}
