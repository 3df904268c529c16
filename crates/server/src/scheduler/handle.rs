use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, oneshot};

use domain::Subscription;

use super::messages::{JobStatus, SchedulerError, SchedulerMessage};
use super::runner::SchedulerActor;
use super::TickRunner;

/// Cloneable handle to the scheduler actor.
///
/// All mutation of the job table goes through messages on a single
/// channel, so there is never shared mutable state between callers.
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerMessage>,
}

impl SchedulerHandle {
    /// Spawn the scheduler actor and return its handle.
    pub fn spawn(runner: Arc<dyn TickRunner>) -> Self {
        let (sender, receiver) = mpsc::channel(64);
        let handle = Self { sender };

        let actor = SchedulerActor::new(runner, receiver, handle.clone());
        tokio::spawn(actor.run());

        handle
    }

    /// Schedule a subscription under its name.
    pub async fn add_job(&self, subscription: Subscription) -> Result<(), SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(SchedulerMessage::AddJob {
                subscription,
                reply,
            })
            .await
            .map_err(|_| SchedulerError::Stopped)?;
        rx.await.map_err(|_| SchedulerError::Stopped)?
    }

    /// Unschedule a job; removing an absent name is a no-op.
    pub async fn remove_job(&self, name: &str) -> Result<(), SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(SchedulerMessage::RemoveJob {
                name: name.to_string(),
                reply,
            })
            .await
            .map_err(|_| SchedulerError::Stopped)?;
        rx.await.map_err(|_| SchedulerError::Stopped)?
    }

    /// Replace the job registered under `old_name` with a fresh schedule
    /// for `subscription` (which may carry a new name).
    pub async fn update_job(
        &self,
        old_name: &str,
        subscription: Subscription,
    ) -> Result<(), SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(SchedulerMessage::UpdateJob {
                old_name: old_name.to_string(),
                subscription,
                reply,
            })
            .await
            .map_err(|_| SchedulerError::Stopped)?;
        rx.await.map_err(|_| SchedulerError::Stopped)?
    }

    /// Run a job immediately, outside its schedule.
    pub async fn trigger_job(&self, name: &str) -> Result<(), SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(SchedulerMessage::TriggerJob {
                name: name.to_string(),
                reply,
            })
            .await
            .map_err(|_| SchedulerError::Stopped)?;
        rx.await.map_err(|_| SchedulerError::Stopped)?
    }

    pub async fn list_jobs(&self) -> Result<Vec<JobStatus>, SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(SchedulerMessage::ListJobs { reply })
            .await
            .map_err(|_| SchedulerError::Stopped)?;
        rx.await.map_err(|_| SchedulerError::Stopped)
    }

    pub(crate) async fn send_timer_tick(&self, name: String, scheduled_at: DateTime<Local>) {
        let _ = self
            .sender
            .send(SchedulerMessage::TimerTick { name, scheduled_at })
            .await;
    }

    pub(crate) async fn send_tick_completed(&self, name: String, success: bool) {
        let _ = self
            .sender
            .send(SchedulerMessage::TickCompleted { name, success })
            .await;
    }
}
