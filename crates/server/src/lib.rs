//! Server wiring: configuration, storage, scheduling, and the per-tick
//! execution pipeline.

pub mod collaborators;
pub mod config;
pub mod pipeline;
pub mod registry;
pub mod scheduler;
pub mod store;

pub use config::{Config, ConfigError};
pub use pipeline::{ExecutionPipeline, PipelineError};
pub use registry::{load_subscriptions, RegistryError, SubscriptionRegistry};
pub use scheduler::{SchedulerError, SchedulerHandle, TickRunner};
pub use store::{ContentStore, StorageError};

use std::sync::Arc;

use domain::CapabilityRegistry;

/// Build the capability table from every compiled-in spider and action.
pub fn build_capability_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    spider::register_all(&mut registry);
    action::register_all(&mut registry);
    registry
}

/// Run the server until interrupted.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let capabilities = Arc::new(build_capability_registry());
    let store = ContentStore::new(&config.data_path)?;
    let actions = collaborators::build_action_context(&config);

    let pipeline = Arc::new(ExecutionPipeline::new(
        store,
        capabilities,
        actions,
        config.proxy.clone(),
    ));
    let scheduler = SchedulerHandle::spawn(pipeline);
    let registry = SubscriptionRegistry::new(&config.data_path, scheduler.clone())?;

    let mut scheduled = 0;
    for subscription in registry.list() {
        if !subscription.enable {
            tracing::info!("Subscription '{}' is disabled, skipping", subscription.name);
            continue;
        }
        let name = subscription.name.clone();
        match scheduler.add_job(subscription).await {
            Ok(()) => scheduled += 1,
            Err(e) => tracing::error!("Failed to schedule '{}': {}", name, e),
        }
    }
    tracing::info!("Server started with {} scheduled subscription(s)", scheduled);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
