//! Shared mocks and builders for action tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use domain::{Record, RecordPayload, SpiderConfig, Subscription};

use crate::error::ActionError;
use crate::ports::{ChatTransport, OfflineDownloader};

/// Records every message; optionally fails every send.
pub struct MockChat {
    sent: Arc<Mutex<Vec<(i64, String)>>>,
    fail: bool,
}

impl MockChat {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for MockChat {
    async fn send_message(&self, chat_id: i64, text: &str) -> crate::Result<()> {
        if self.fail {
            return Err(ActionError::Transport("mock transport down".to_string()));
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

/// Records every submitted task; optionally fails every submission.
pub struct MockDownloader {
    tasks: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    pub fn tasks(&self) -> Vec<(String, String)> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl OfflineDownloader for MockDownloader {
    async fn add_task(&self, file_url: &str, save_path: &str) -> crate::Result<String> {
        if self.fail {
            return Err(ActionError::Downloader("mock downloader down".to_string()));
        }
        self.tasks
            .lock()
            .unwrap()
            .push((file_url.to_string(), save_path.to_string()));
        Ok(format!("task-{}", self.tasks.lock().unwrap().len()))
    }
}

pub fn subscription() -> Subscription {
    Subscription {
        name: "feed1".to_string(),
        cron: "*/5 * * * * *".to_string(),
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

pub fn plain_record(key: &str) -> Record {
    Record {
        id: format!("RssSpider_{key}"),
        title: Some(format!("title {key}")),
        content: Some(format!("content {key}")),
        url: Some("https://example.com/post".to_string()),
        source: Some("feed1".to_string()),
        push_time: 1_700_000_000_000,
        extend: None,
        payload: RecordPayload::Plain,
    }
}

pub fn torrent_record(key: &str) -> Record {
    Record {
        id: format!("MikanSpider_{key}"),
        title: Some(format!("episode {key}")),
        content: None,
        url: None,
        source: Some("feed1".to_string()),
        push_time: 1_700_000_000_000,
        extend: None,
        payload: RecordPayload::Torrent {
            torrent_url: Some(format!("https://example.com/{key}.torrent")),
            magnet_url: Some(format!("magnet:?xt=urn:btih:{key}")),
            content_length: 1024,
            category: Some("Show".to_string()),
        },
    }
}
