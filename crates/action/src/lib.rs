//! Action variants: pluggable delivery mechanisms.
//!
//! An action consumes a batch of new records for a subscription and
//! performs a side-effecting delivery. Delivery is at-least-once: a
//! redelivered batch will re-notify. Outward side effects go through
//! the narrow ports defined in [`ports`], so transports stay swappable
//! and mockable.

mod chat_push;
mod error;
mod offline_download;
mod ports;
#[cfg(test)]
mod test_support;
mod traits;

pub use chat_push::ChatPushAction;
pub use error::ActionError;
pub use offline_download::OfflineDownloadAction;
pub use ports::{ChatTransport, OfflineDownloader};
pub use traits::Action;

use std::sync::Arc;

use domain::{ActionConfig, ActionKind, CapabilityRegistry};

pub type Result<T> = std::result::Result<T, ActionError>;

/// Register every action kind and its capability requirements.
pub fn register_all(registry: &mut CapabilityRegistry) {
    registry.register_action(ActionKind::ChatPush);
    registry.register_action(ActionKind::OfflineDownload);
}

/// Deployment-level collaborators shared by all action instances.
///
/// Static configuration lives here and is never persisted with
/// subscriptions.
#[derive(Clone)]
pub struct ActionContext {
    pub chat: Arc<dyn ChatTransport>,
    pub downloader: Arc<dyn OfflineDownloader>,
    /// Root path prepended to per-record save paths.
    pub save_root_path: String,
}

/// Build an action instance from a subscription's dynamic configuration.
pub fn build_action(config: &ActionConfig, ctx: &ActionContext) -> Box<dyn Action> {
    match config {
        ActionConfig::ChatPush { chat_ids } => Box::new(ChatPushAction::new(
            chat_ids.clone(),
            Arc::clone(&ctx.chat),
        )),
        ActionConfig::OfflineDownload { chat_ids } => Box::new(OfflineDownloadAction::new(
            chat_ids.clone(),
            Arc::clone(&ctx.downloader),
            Arc::clone(&ctx.chat),
            ctx.save_root_path.clone(),
        )),
    }
}
