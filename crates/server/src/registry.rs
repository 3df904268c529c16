//! Persistent subscription list.
//!
//! Subscriptions live in a single JSON file under the data directory
//! and are mirrored into the scheduler. The file is the source of
//! truth: every mutation persists first, then drives the scheduler.
//! Scheduling failures (an unsatisfiable cron, say) are logged but do
//! not roll back the stored record, so a bad expression can be fixed
//! by a later update instead of losing the subscription.

use std::path::{Path, PathBuf};

use thiserror::Error;

use domain::Subscription;

use crate::scheduler::SchedulerHandle;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("subscription file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("subscription file serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] domain::DomainError),

    #[error("subscription '{0}' already exists")]
    DuplicateName(String),

    #[error("subscription '{0}' not found")]
    NotFound(String),
}

/// Load the subscription list from `{data_path}/config/config.json`.
///
/// Missing or corrupt files yield an empty list.
pub fn load_subscriptions(data_path: impl AsRef<Path>) -> Vec<Subscription> {
    let path = subscriptions_file(data_path.as_ref());
    let raw = match std::fs::read(&path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_slice(&raw) {
        Ok(subscriptions) => subscriptions,
        Err(e) => {
            tracing::warn!(
                "Subscription file {} is corrupt, starting with an empty list: {}",
                path.display(),
                e
            );
            Vec::new()
        }
    }
}

fn subscriptions_file(data_path: &Path) -> PathBuf {
    data_path.join("config").join("config.json")
}

pub struct SubscriptionRegistry {
    file: PathBuf,
    scheduler: SchedulerHandle,
}

impl SubscriptionRegistry {
    pub fn new(
        data_path: impl AsRef<Path>,
        scheduler: SchedulerHandle,
    ) -> Result<Self, RegistryError> {
        let file = subscriptions_file(data_path.as_ref());
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { file, scheduler })
    }

    pub fn list(&self) -> Vec<Subscription> {
        self.load()
    }

    /// Persist a new subscription and schedule it if enabled.
    pub async fn add(&self, subscription: Subscription) -> Result<(), RegistryError> {
        subscription.validate()?;

        let mut subscriptions = self.load();
        if subscriptions.iter().any(|s| s.name == subscription.name) {
            return Err(RegistryError::DuplicateName(subscription.name));
        }
        subscriptions.push(subscription.clone());
        self.save(&subscriptions)?;

        if subscription.enable {
            if let Err(e) = self.scheduler.add_job(subscription.clone()).await {
                tracing::error!("Failed to schedule '{}': {}", subscription.name, e);
            }
        }
        Ok(())
    }

    /// Replace the subscription named `old_name` and reschedule.
    ///
    /// The replacement may carry a different name; the old job is
    /// always unscheduled first.
    pub async fn update(
        &self,
        old_name: &str,
        subscription: Subscription,
    ) -> Result<(), RegistryError> {
        subscription.validate()?;

        let mut subscriptions = self.load();
        let index = subscriptions
            .iter()
            .position(|s| s.name == old_name)
            .ok_or_else(|| RegistryError::NotFound(old_name.to_string()))?;
        if old_name != subscription.name
            && subscriptions.iter().any(|s| s.name == subscription.name)
        {
            return Err(RegistryError::DuplicateName(subscription.name));
        }
        subscriptions[index] = subscription.clone();
        self.save(&subscriptions)?;

        if let Err(e) = self.scheduler.remove_job(old_name).await {
            tracing::error!("Failed to unschedule '{}': {}", old_name, e);
        }
        if subscription.enable {
            if let Err(e) = self.scheduler.add_job(subscription.clone()).await {
                tracing::error!("Failed to schedule '{}': {}", subscription.name, e);
            }
        }
        Ok(())
    }

    /// Remove a subscription and unschedule it.
    pub async fn delete(&self, name: &str) -> Result<(), RegistryError> {
        let mut subscriptions = self.load();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.name != name);
        if subscriptions.len() == before {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        self.save(&subscriptions)?;

        if let Err(e) = self.scheduler.remove_job(name).await {
            tracing::error!("Failed to unschedule '{}': {}", name, e);
        }
        Ok(())
    }

    fn load(&self) -> Vec<Subscription> {
        let raw = match std::fs::read(&self.file) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_slice(&raw) {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                tracing::warn!(
                    "Subscription file {} is corrupt, starting with an empty list: {}",
                    self.file.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    fn save(&self, subscriptions: &[Subscription]) -> Result<(), RegistryError> {
        let raw = serde_json::to_vec_pretty(subscriptions)?;
        std::fs::write(&self.file, raw)?;
        Ok(())
    }
}
