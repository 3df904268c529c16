//! Per-tick execution pipeline.
//!
//! One tick is a straight line through the stages: fetch raw data,
//! parse it into records, apply keyword filters, diff against stored
//! history, enrich, dispatch the new records to the subscription's
//! actions, and finally persist. Dispatch failures are logged and never
//! block persistence, so a record is delivered at most once per
//! observation even when a transport flakes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;

use action::ActionContext;
use domain::{CapabilityRegistry, Record, Subscription};
use spider::{FetchContext, Spider};

use crate::scheduler::{TickResult, TickRunner};
use crate::store::{ContentStore, StorageError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Spider(#[from] spider::SpiderError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct ExecutionPipeline {
    store: ContentStore,
    capabilities: Arc<CapabilityRegistry>,
    actions: ActionContext,
    proxy: Option<String>,
}

impl ExecutionPipeline {
    pub fn new(
        store: ContentStore,
        capabilities: Arc<CapabilityRegistry>,
        actions: ActionContext,
        proxy: Option<String>,
    ) -> Self {
        Self {
            store,
            capabilities,
            actions,
            proxy,
        }
    }

    /// Run one full cycle for a subscription.
    pub async fn run(&self, subscription: &Subscription) -> Result<(), PipelineError> {
        let spider = spider::build_spider(&subscription.spider);
        self.run_with_spider(subscription, spider.as_ref()).await
    }

    async fn run_with_spider(
        &self,
        subscription: &Subscription,
        spider: &dyn Spider,
    ) -> Result<(), PipelineError> {
        let ctx = FetchContext {
            proxy: if subscription.enable_proxy {
                self.proxy.clone()
            } else {
                None
            },
        };

        let raw = spider.fetch(subscription, &ctx).await?;
        let records = spider.parse(subscription, &raw)?;
        if records.is_empty() {
            tracing::debug!("Subscription '{}': source yielded no records", subscription.name);
            return Ok(());
        }

        let records = spider.filter(records, subscription);
        if records.is_empty() {
            tracing::debug!(
                "Subscription '{}': all records filtered by keyword rules",
                subscription.name
            );
            return Ok(());
        }

        let new = self.store.check_new(records, subscription).await?;
        if new.is_empty() {
            tracing::debug!("Subscription '{}': no new records", subscription.name);
            return Ok(());
        }

        let new = spider.postprocess(new, subscription).await;
        tracing::info!(
            "Subscription '{}': {} new record(s)",
            subscription.name,
            new.len()
        );

        self.dispatch(&new, subscription, spider).await;
        self.store.persist(&new, subscription).await?;
        Ok(())
    }

    /// Fan the batch out to every compatible configured action.
    ///
    /// Incompatible actions are skipped silently; a capability mismatch
    /// is a configuration fact, not a runtime fault.
    async fn dispatch(&self, records: &[Record], subscription: &Subscription, spider: &dyn Spider) {
        let mut actions = Vec::new();
        for config in &subscription.actions {
            if !self.capabilities.supports(spider.kind(), config.kind()) {
                tracing::debug!(
                    "Subscription '{}': action {:?} does not support records from {:?}, skipping",
                    subscription.name,
                    config.kind(),
                    spider.kind()
                );
                continue;
            }
            actions.push(action::build_action(config, &self.actions));
        }

        let results = join_all(
            actions
                .iter()
                .map(|action| action.execute(records, subscription)),
        )
        .await;

        for (action, result) in actions.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!(
                    "Subscription '{}': action {:?} failed: {}",
                    subscription.name,
                    action.kind(),
                    e
                );
            }
        }
    }
}

#[async_trait]
impl TickRunner for ExecutionPipeline {
    async fn run_tick(&self, subscription: &Subscription) -> TickResult {
        self.run(subscription).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use domain::{ActionConfig, RecordKind, RecordPayload, SpiderConfig, SpiderKind};
    use spider::RawResponse;

    use super::*;

    /// Spider scripted with a fixed batch of records per fetch.
    struct ScriptedSpider {
        batches: Mutex<Vec<Vec<Record>>>,
    }

    impl ScriptedSpider {
        fn new(batches: Vec<Vec<Record>>) -> Self {
            Self {
                batches: Mutex::new(batches),
            }
        }
    }

    #[async_trait]
    impl Spider for ScriptedSpider {
        fn kind(&self) -> SpiderKind {
            SpiderKind::Rss
        }

        fn record_kind(&self) -> RecordKind {
            RecordKind::Plain
        }

        async fn fetch(
            &self,
            _subscription: &Subscription,
            _ctx: &FetchContext,
        ) -> spider::Result<RawResponse> {
            Ok(RawResponse::Http(fetch::Response {
                status_code: 200,
                body: String::new(),
                headers: Default::default(),
            }))
        }

        fn parse(
            &self,
            _subscription: &Subscription,
            _raw: &RawResponse,
        ) -> spider::Result<Vec<Record>> {
            let mut batches = self.batches.lock().unwrap();
            if batches.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(batches.remove(0))
            }
        }
    }

    struct CountingChat {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl action::ChatTransport for CountingChat {
        async fn send_message(&self, chat_id: i64, text: &str) -> action::Result<()> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    struct FailingChat;

    #[async_trait]
    impl action::ChatTransport for FailingChat {
        async fn send_message(&self, _chat_id: i64, _text: &str) -> action::Result<()> {
            Err(action::ActionError::Transport("down".to_string()))
        }
    }

    struct NoDownloader;

    #[async_trait]
    impl action::OfflineDownloader for NoDownloader {
        async fn add_task(&self, _file_url: &str, _save_path: &str) -> action::Result<String> {
            Err(action::ActionError::Downloader("unconfigured".to_string()))
        }
    }

    fn record(id: &str) -> Record {
        Record {
            id: id.to_string(),
            title: Some(format!("title {id}")),
            content: Some(format!("content {id}")),
            url: None,
            source: Some("feed1".to_string()),
            push_time: 1_700_000_000_000,
            extend: None,
            payload: RecordPayload::Plain,
        }
    }

    fn subscription(actions: Vec<ActionConfig>) -> Subscription {
        Subscription {
            name: "feed1".to_string(),
            cron: "*/5 * * * * *".to_string(),
            spider: SpiderConfig::Rss {
                url: "https://example.com/feed.xml".to_string(),
            },
            actions,
            enable: true,
            enable_proxy: false,
            white_keywords: vec![],
            black_keywords: vec![],
        }
    }

    fn registry() -> Arc<CapabilityRegistry> {
        let mut registry = CapabilityRegistry::new();
        spider::register_all(&mut registry);
        action::register_all(&mut registry);
        Arc::new(registry)
    }

    fn context(chat: Arc<dyn action::ChatTransport>) -> ActionContext {
        ActionContext {
            chat,
            downloader: Arc::new(NoDownloader),
            save_root_path: "/downloads".to_string(),
        }
    }

    #[tokio::test]
    async fn first_tick_bootstraps_second_tick_dispatches_diff() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path()).unwrap();
        let chat = Arc::new(CountingChat {
            sent: Mutex::new(Vec::new()),
        });
        let pipeline = ExecutionPipeline::new(store, registry(), context(chat.clone()), None);

        let sub = subscription(vec![ActionConfig::ChatPush { chat_ids: vec![7] }]);
        let spider = ScriptedSpider::new(vec![
            vec![record("feed1_1"), record("feed1_2"), record("feed1_3")],
            vec![
                record("feed1_1"),
                record("feed1_2"),
                record("feed1_3"),
                record("feed1_42"),
            ],
        ]);

        // First observation: history is seeded, nothing delivered.
        pipeline.run_with_spider(&sub, &spider).await.unwrap();
        assert!(chat.sent.lock().unwrap().is_empty());
        assert_eq!(pipeline.store.load(&sub).await.len(), 3);

        // Second tick: only the unseen record goes out.
        pipeline.run_with_spider(&sub, &spider).await.unwrap();
        let sent = chat.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 7);
        assert!(sent[0].1.contains("title feed1_42"));
        assert_eq!(pipeline.store.load(&sub).await.len(), 4);
    }

    #[tokio::test]
    async fn incompatible_action_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path()).unwrap();
        let chat = Arc::new(CountingChat {
            sent: Mutex::new(Vec::new()),
        });
        let pipeline = ExecutionPipeline::new(store, registry(), context(chat.clone()), None);

        // OfflineDownload needs torrent records; an Rss spider only
        // produces plain ones.
        let sub = subscription(vec![ActionConfig::OfflineDownload { chat_ids: vec![7] }]);
        let spider = ScriptedSpider::new(vec![
            vec![record("feed1_1")],
            vec![record("feed1_1"), record("feed1_2")],
        ]);

        pipeline.run_with_spider(&sub, &spider).await.unwrap();
        pipeline.run_with_spider(&sub, &spider).await.unwrap();

        assert!(chat.sent.lock().unwrap().is_empty());
        assert_eq!(pipeline.store.load(&sub).await.len(), 2);
    }

    #[tokio::test]
    async fn dispatch_failure_does_not_block_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path()).unwrap();
        let pipeline =
            ExecutionPipeline::new(store, registry(), context(Arc::new(FailingChat)), None);

        let sub = subscription(vec![ActionConfig::ChatPush { chat_ids: vec![7] }]);
        let spider = ScriptedSpider::new(vec![
            vec![record("feed1_1")],
            vec![record("feed1_1"), record("feed1_2")],
        ]);

        pipeline.run_with_spider(&sub, &spider).await.unwrap();
        pipeline.run_with_spider(&sub, &spider).await.unwrap();

        // The failed delivery is still recorded as seen.
        assert_eq!(pipeline.store.load(&sub).await.len(), 2);
    }

    #[tokio::test]
    async fn keyword_filter_runs_before_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path()).unwrap();
        let chat = Arc::new(CountingChat {
            sent: Mutex::new(Vec::new()),
        });
        let pipeline = ExecutionPipeline::new(store, registry(), context(chat.clone()), None);

        let mut sub = subscription(vec![ActionConfig::ChatPush { chat_ids: vec![7] }]);
        sub.black_keywords = vec!["feed1_2".to_string()];
        let spider = ScriptedSpider::new(vec![
            vec![record("feed1_1")],
            vec![record("feed1_1"), record("feed1_2")],
        ]);

        pipeline.run_with_spider(&sub, &spider).await.unwrap();
        pipeline.run_with_spider(&sub, &spider).await.unwrap();

        // The denied record never reaches dispatch nor the store.
        assert!(chat.sent.lock().unwrap().is_empty());
        assert_eq!(pipeline.store.load(&sub).await.len(), 1);
    }
}
