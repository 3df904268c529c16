mod handle;
mod messages;
mod runner;

pub use handle::SchedulerHandle;
pub use messages::{JobStatus, SchedulerError};

use async_trait::async_trait;

/// Result type for a single subscription tick.
pub type TickResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Executes one full polling cycle for a subscription.
///
/// The scheduler owns timing only; everything that happens inside a
/// tick lives behind this trait so the actor can be tested without a
/// real pipeline.
#[async_trait]
pub trait TickRunner: Send + Sync {
    async fn run_tick(&self, subscription: &domain::Subscription) -> TickResult;
}
