//! Generic RSS/Atom spider.

use async_trait::async_trait;
use chrono::Utc;
use feed_rs::model::{Entry, Feed};

use domain::{Record, RecordKind, RecordPayload, SpiderKind, Subscription};
use fetch::HttpClient;

use crate::error::SpiderError;
use crate::traits::{FetchContext, RawResponse, Spider};

/// Polls any RSS or Atom feed and turns entries into plain records.
pub struct RssSpider {
    url: String,
    client: HttpClient,
}

impl RssSpider {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: HttpClient::new(),
        }
    }
}

#[async_trait]
impl Spider for RssSpider {
    fn kind(&self) -> SpiderKind {
        SpiderKind::Rss
    }

    fn record_kind(&self) -> RecordKind {
        RecordKind::Plain
    }

    async fn fetch(
        &self,
        _subscription: &Subscription,
        ctx: &FetchContext,
    ) -> crate::Result<RawResponse> {
        let response = self.client.get(&self.url, ctx.proxy.as_deref()).await?;
        if !response.is_success() {
            return Err(SpiderError::Fetch(fetch::FetchError::Status {
                url: self.url.clone(),
                status: response.status_code,
            }));
        }
        Ok(RawResponse::Http(response))
    }

    fn parse(&self, subscription: &Subscription, raw: &RawResponse) -> crate::Result<Vec<Record>> {
        let RawResponse::Http(response) = raw else {
            return Err(SpiderError::Parse("expected an HTTP response".to_string()));
        };
        let feed = parse_feed(response.body.as_bytes())?;
        let source = feed_title(&feed).unwrap_or_else(|| subscription.name.clone());

        let records = feed
            .entries
            .iter()
            .map(|entry| Record {
                id: self.only_id(&entry_natural_key(entry)),
                title: entry.title.as_ref().map(|t| t.content.clone()),
                content: entry.summary.as_ref().map(|t| t.content.clone()),
                url: entry.links.first().map(|l| l.href.clone()),
                source: Some(source.clone()),
                push_time: entry_push_time(entry),
                extend: None,
                payload: RecordPayload::Plain,
            })
            .collect();
        Ok(records)
    }
}

pub(crate) fn parse_feed(bytes: &[u8]) -> crate::Result<Feed> {
    feed_rs::parser::parse(bytes).map_err(|e| SpiderError::Parse(e.to_string()))
}

pub(crate) fn feed_title(feed: &Feed) -> Option<String> {
    feed.title.as_ref().map(|t| t.content.clone())
}

/// Stable natural key for one entry: guid, else link, else title.
pub(crate) fn entry_natural_key(entry: &Entry) -> String {
    if !entry.id.is_empty() {
        return entry.id.clone();
    }
    if let Some(link) = entry.links.first() {
        return link.href.clone();
    }
    entry
        .title
        .as_ref()
        .map(|t| t.content.clone())
        .unwrap_or_default()
}

/// Entry timestamp in milliseconds: published, else updated, else now.
pub(crate) fn entry_push_time(entry: &Entry) -> i64 {
    entry
        .published
        .or(entry.updated)
        .unwrap_or_else(Utc::now)
        .timestamp_millis()
}
