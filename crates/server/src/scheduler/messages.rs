use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::sync::oneshot;

use domain::Subscription;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression '{0}': {1}")]
    InvalidCron(String, String),

    #[error("job '{0}' not found")]
    JobNotFound(String),

    #[error("job '{0}' is already running")]
    JobAlreadyRunning(String),

    #[error("scheduler is stopped")]
    Stopped,
}

/// Snapshot of one scheduled job, for listing.
#[derive(Debug, Clone)]
pub struct JobStatus {
    pub name: String,
    pub cron: String,
    pub is_running: bool,
}

pub enum SchedulerMessage {
    AddJob {
        subscription: Subscription,
        reply: oneshot::Sender<Result<(), SchedulerError>>,
    },
    RemoveJob {
        name: String,
        reply: oneshot::Sender<Result<(), SchedulerError>>,
    },
    UpdateJob {
        old_name: String,
        subscription: Subscription,
        reply: oneshot::Sender<Result<(), SchedulerError>>,
    },
    TriggerJob {
        name: String,
        reply: oneshot::Sender<Result<(), SchedulerError>>,
    },
    ListJobs {
        reply: oneshot::Sender<Vec<JobStatus>>,
    },
    TimerTick {
        name: String,
        scheduled_at: DateTime<Local>,
    },
    TickCompleted {
        name: String,
        success: bool,
    },
}
