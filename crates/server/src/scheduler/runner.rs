use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use cron::Schedule;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use domain::Subscription;

use super::handle::SchedulerHandle;
use super::messages::{JobStatus, SchedulerError, SchedulerMessage};
use super::TickRunner;

/// A tick that arrives later than this after its scheduled time is a
/// misfire and is dropped instead of run.
const MISFIRE_GRACE: Duration = Duration::from_secs(3);

/// Delay before a freshly added job fires for the first time.
const FIRST_FIRE_DELAY: Duration = Duration::from_secs(1);

/// Runtime state of a single scheduled subscription.
struct JobEntry {
    subscription: Subscription,
    timer: JoinHandle<()>,
    is_running: bool,
}

/// Scheduler actor.
///
/// Ticks run in detached tokio tasks so the actor loop stays
/// responsive; the `is_running` flag guarantees at most one in-flight
/// tick per subscription.
pub struct SchedulerActor {
    runner: Arc<dyn TickRunner>,
    jobs: HashMap<String, JobEntry>,
    receiver: mpsc::Receiver<SchedulerMessage>,
    handle: SchedulerHandle,
}

impl SchedulerActor {
    pub fn new(
        runner: Arc<dyn TickRunner>,
        receiver: mpsc::Receiver<SchedulerMessage>,
        handle: SchedulerHandle,
    ) -> Self {
        Self {
            runner,
            jobs: HashMap::new(),
            receiver,
            handle,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Scheduler actor started");

        while let Some(msg) = self.receiver.recv().await {
            self.handle_message(msg);
        }

        // Stop firing timers once every handle is gone.
        for entry in self.jobs.values() {
            entry.timer.abort();
        }
        tracing::info!("Scheduler actor stopped");
    }

    fn handle_message(&mut self, msg: SchedulerMessage) {
        match msg {
            SchedulerMessage::AddJob {
                subscription,
                reply,
            } => {
                let result = self.add_job(subscription);
                let _ = reply.send(result);
            }

            SchedulerMessage::RemoveJob { name, reply } => {
                self.remove_job(&name);
                let _ = reply.send(Ok(()));
            }

            SchedulerMessage::UpdateJob {
                old_name,
                subscription,
                reply,
            } => {
                if old_name != subscription.name {
                    self.remove_job(&old_name);
                }
                let result = self.add_job(subscription);
                let _ = reply.send(result);
            }

            SchedulerMessage::TriggerJob { name, reply } => {
                let result = self.trigger_job(&name);
                let _ = reply.send(result);
            }

            SchedulerMessage::ListJobs { reply } => {
                let _ = reply.send(self.job_statuses());
            }

            SchedulerMessage::TimerTick { name, scheduled_at } => {
                self.handle_timer_tick(&name, scheduled_at);
            }

            SchedulerMessage::TickCompleted { name, success } => {
                if let Some(entry) = self.jobs.get_mut(&name) {
                    entry.is_running = false;
                }
                if success {
                    tracing::debug!("Job '{}' tick completed", name);
                } else {
                    tracing::error!("Job '{}' tick failed", name);
                }
            }
        }
    }

    fn add_job(&mut self, subscription: Subscription) -> Result<(), SchedulerError> {
        let schedule = Schedule::from_str(&subscription.cron).map_err(|e| {
            SchedulerError::InvalidCron(subscription.cron.clone(), e.to_string())
        })?;

        let name = subscription.name.clone();
        // Re-adding under an existing name replaces the old schedule but
        // keeps the in-flight flag: a tick started under the old entry is
        // still running, and two ticks must never overlap per name.
        let was_running = self.jobs.get(&name).map(|e| e.is_running).unwrap_or(false);
        self.remove_job(&name);

        let timer = spawn_timer(name.clone(), schedule, self.handle.clone());
        tracing::info!("Scheduled job '{}' with cron '{}'", name, subscription.cron);
        self.jobs.insert(
            name,
            JobEntry {
                subscription,
                timer,
                is_running: was_running,
            },
        );
        Ok(())
    }

    fn remove_job(&mut self, name: &str) {
        if let Some(entry) = self.jobs.remove(name) {
            entry.timer.abort();
            tracing::info!("Unscheduled job '{}'", name);
        }
    }

    fn trigger_job(&mut self, name: &str) -> Result<(), SchedulerError> {
        match self.jobs.get(name) {
            Some(entry) if entry.is_running => {
                Err(SchedulerError::JobAlreadyRunning(name.to_string()))
            }
            Some(_) => {
                self.spawn_tick(name);
                Ok(())
            }
            None => Err(SchedulerError::JobNotFound(name.to_string())),
        }
    }

    fn handle_timer_tick(&mut self, name: &str, scheduled_at: DateTime<Local>) {
        let late = (Local::now() - scheduled_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if late > MISFIRE_GRACE {
            tracing::warn!(
                "Job '{}' missed its scheduled time by {:.1}s, skipping tick",
                name,
                late.as_secs_f64()
            );
            return;
        }
        self.spawn_tick(name);
    }

    /// Start one tick in a detached task, unless one is in flight.
    fn spawn_tick(&mut self, name: &str) {
        let entry = match self.jobs.get_mut(name) {
            Some(e) => e,
            None => return,
        };

        if entry.is_running {
            tracing::debug!("Job '{}' is already running, skipping this tick", name);
            return;
        }
        entry.is_running = true;

        let runner = Arc::clone(&self.runner);
        let subscription = entry.subscription.clone();
        let handle = self.handle.clone();
        let name = name.to_string();

        tokio::spawn(async move {
            let result = runner.run_tick(&subscription).await;
            if let Err(e) = &result {
                tracing::error!("Job '{}' tick error: {}", name, e);
            }
            handle.send_tick_completed(name, result.is_ok()).await;
        });
    }

    fn job_statuses(&self) -> Vec<JobStatus> {
        self.jobs
            .iter()
            .map(|(name, entry)| JobStatus {
                name: name.clone(),
                cron: entry.subscription.cron.clone(),
                is_running: entry.is_running,
            })
            .collect()
    }
}

/// Timer task for one job: one immediate warm-up fire shortly after
/// scheduling, then fires at each upcoming cron occurrence.
fn spawn_timer(name: String, schedule: Schedule, handle: SchedulerHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(FIRST_FIRE_DELAY).await;
        handle.send_timer_tick(name.clone(), Local::now()).await;

        loop {
            let next = match schedule.upcoming(Local).next() {
                Some(next) => next,
                None => {
                    tracing::warn!("Job '{}' has no further occurrences, timer exiting", name);
                    return;
                }
            };
            let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;
            handle.send_timer_tick(name.clone(), next).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use domain::SpiderConfig;

    use super::super::{SchedulerHandle, TickRunner, TickResult};
    use super::*;

    struct RecordingRunner {
        ticks: Mutex<Vec<String>>,
    }

    impl RecordingRunner {
        fn new() -> Self {
            Self {
                ticks: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TickRunner for RecordingRunner {
        async fn run_tick(&self, subscription: &Subscription) -> TickResult {
            self.ticks.lock().unwrap().push(subscription.name.clone());
            Ok(())
        }
    }

    fn subscription(name: &str, cron: &str) -> Subscription {
        Subscription {
            name: name.to_string(),
            cron: cron.to_string(),
            spider: SpiderConfig::Rss {
                url: "https://example.com/feed.xml".to_string(),
            },
            actions: vec![],
            enable: true,
            enable_proxy: false,
            white_keywords: vec![],
            black_keywords: vec![],
        }
    }

    #[tokio::test]
    async fn add_and_list_jobs() {
        let runner = Arc::new(RecordingRunner::new());
        let handle = SchedulerHandle::spawn(runner);

        handle
            .add_job(subscription("feed1", "0 0 * * * *"))
            .await
            .unwrap();
        handle
            .add_job(subscription("feed2", "0 30 * * * *"))
            .await
            .unwrap();

        let mut jobs = handle.list_jobs().await.unwrap();
        jobs.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].name, "feed1");
        assert_eq!(jobs[0].cron, "0 0 * * * *");
        assert!(!jobs[0].is_running);
    }

    #[tokio::test]
    async fn invalid_cron_is_rejected() {
        let handle = SchedulerHandle::spawn(Arc::new(RecordingRunner::new()));

        let err = handle
            .add_job(subscription("feed1", "not a cron"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCron(..)));
        assert!(handle.list_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_absent_job_is_noop() {
        let handle = SchedulerHandle::spawn(Arc::new(RecordingRunner::new()));
        handle.remove_job("nope").await.unwrap();
    }

    #[tokio::test]
    async fn update_renames_job() {
        let handle = SchedulerHandle::spawn(Arc::new(RecordingRunner::new()));

        handle
            .add_job(subscription("old", "0 0 * * * *"))
            .await
            .unwrap();
        handle
            .update_job("old", subscription("new", "0 30 * * * *"))
            .await
            .unwrap();

        let jobs = handle.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "new");
    }

    #[tokio::test]
    async fn trigger_unknown_job_fails() {
        let handle = SchedulerHandle::spawn(Arc::new(RecordingRunner::new()));

        let err = handle.trigger_job("ghost").await.unwrap_err();
        assert!(matches!(err, SchedulerError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn trigger_runs_the_tick() {
        let runner = Arc::new(RecordingRunner::new());
        let handle = SchedulerHandle::spawn(Arc::clone(&runner) as Arc<dyn TickRunner>);

        handle
            .add_job(subscription("feed1", "0 0 * * * *"))
            .await
            .unwrap();
        handle.trigger_job("feed1").await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*runner.ticks.lock().unwrap(), vec!["feed1".to_string()]);
    }

    /// Blocks inside the tick until released, counting starts.
    struct BlockingRunner {
        started: Mutex<usize>,
        gate: tokio::sync::Semaphore,
    }

    impl BlockingRunner {
        fn new() -> Self {
            Self {
                started: Mutex::new(0),
                gate: tokio::sync::Semaphore::new(0),
            }
        }
    }

    #[async_trait]
    impl TickRunner for BlockingRunner {
        async fn run_tick(&self, _subscription: &Subscription) -> TickResult {
            *self.started.lock().unwrap() += 1;
            let _permit = self.gate.acquire().await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn update_keeps_in_flight_tick_exclusive() {
        let runner = Arc::new(BlockingRunner::new());
        let handle = SchedulerHandle::spawn(Arc::clone(&runner) as Arc<dyn TickRunner>);

        handle
            .add_job(subscription("feed1", "0 0 * * * *"))
            .await
            .unwrap();
        handle.trigger_job("feed1").await.unwrap();
        while *runner.started.lock().unwrap() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // Replace the schedule while the first tick is still in flight.
        handle
            .update_job("feed1", subscription("feed1", "0 30 * * * *"))
            .await
            .unwrap();

        let err = handle.trigger_job("feed1").await.unwrap_err();
        assert!(matches!(err, SchedulerError::JobAlreadyRunning(_)));
        assert_eq!(*runner.started.lock().unwrap(), 1);

        // Once the tick finishes the job is free again.
        runner.gate.add_permits(2);
        let mut resumed = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if handle.trigger_job("feed1").await.is_ok() {
                resumed = true;
                break;
            }
        }
        assert!(resumed);
    }

    #[tokio::test]
    async fn stale_tick_is_skipped() {
        let runner = Arc::new(RecordingRunner::new());
        let handle = SchedulerHandle::spawn(Arc::clone(&runner) as Arc<dyn TickRunner>);

        handle
            .add_job(subscription("feed1", "0 0 * * * *"))
            .await
            .unwrap();

        // Observed well past the grace window; must not run.
        handle
            .send_timer_tick(
                "feed1".to_string(),
                Local::now() - chrono::Duration::seconds(10),
            )
            .await;
        // A punctual tick still goes through.
        handle.send_timer_tick("feed1".to_string(), Local::now()).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*runner.ticks.lock().unwrap(), vec!["feed1".to_string()]);
    }

    #[tokio::test]
    async fn new_job_fires_shortly_after_scheduling() {
        let runner = Arc::new(RecordingRunner::new());
        let handle = SchedulerHandle::spawn(Arc::clone(&runner) as Arc<dyn TickRunner>);

        // A schedule far in the future; only the warm-up fire applies.
        handle
            .add_job(subscription("feed1", "0 0 0 1 1 * 2099"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*runner.ticks.lock().unwrap(), vec!["feed1".to_string()]);
    }
}
