use async_trait::async_trait;

use domain::{ActionKind, Record, Subscription};

/// A pluggable delivery component triggered with new records.
///
/// `execute` is fire-and-forget relative to the pipeline: failures are
/// surfaced to the log but never block sibling actions or persistence.
/// Idempotency is not guaranteed.
#[async_trait]
pub trait Action: Send + Sync {
    fn kind(&self) -> ActionKind;

    async fn execute(&self, records: &[Record], subscription: &Subscription) -> crate::Result<()>;
}
