//! Chat push delivery.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use domain::{ActionKind, Record, Subscription};

use crate::error::ActionError;
use crate::ports::ChatTransport;
use crate::traits::Action;

/// Pushes each record's rendered message to every configured chat.
pub struct ChatPushAction {
    chat_ids: Vec<i64>,
    transport: Arc<dyn ChatTransport>,
}

impl ChatPushAction {
    pub fn new(chat_ids: Vec<i64>, transport: Arc<dyn ChatTransport>) -> Self {
        Self { chat_ids, transport }
    }
}

#[async_trait]
impl Action for ChatPushAction {
    fn kind(&self) -> ActionKind {
        ActionKind::ChatPush
    }

    async fn execute(&self, records: &[Record], subscription: &Subscription) -> crate::Result<()> {
        let mut sends = Vec::new();
        for record in records {
            let Some(text) = record.chat_message_text() else {
                tracing::warn!(
                    "Record {} has no chat message rendering, skipping",
                    record.id
                );
                continue;
            };
            for chat_id in &self.chat_ids {
                let transport = Arc::clone(&self.transport);
                let chat_id = *chat_id;
                let text = text.clone();
                sends.push(async move { transport.send_message(chat_id, &text).await });
            }
        }

        let total = sends.len();
        let mut failed = 0usize;
        for result in join_all(sends).await {
            if let Err(e) = result {
                failed += 1;
                tracing::warn!("Chat push for {} failed: {}", subscription.name, e);
            }
        }
        if failed > 0 {
            return Err(ActionError::Transport(format!(
                "{failed}/{total} sends failed"
            )));
        }
        Ok(())
    }
}
