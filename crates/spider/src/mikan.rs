//! Mikan torrent-feed spider.
//!
//! Parses a Mikan-style RSS feed whose items carry torrent enclosures,
//! producing torrent records that offline-download actions can consume.

use async_trait::async_trait;
use feed_rs::model::Entry;

use domain::{Record, RecordKind, RecordPayload, SpiderKind, Subscription};
use fetch::HttpClient;

use crate::error::SpiderError;
use crate::rss::{entry_natural_key, entry_push_time, feed_title, parse_feed};
use crate::traits::{FetchContext, RawResponse, Spider};

const TORRENT_MEDIA_TYPE: &str = "application/x-bittorrent";

pub struct MikanSpider {
    url: String,
    /// Grouping label applied to every record, used for download paths.
    category: Option<String>,
    client: HttpClient,
}

impl MikanSpider {
    pub fn new(url: String, category: Option<String>) -> Self {
        Self {
            url,
            category,
            client: HttpClient::new(),
        }
    }
}

#[async_trait]
impl Spider for MikanSpider {
    fn kind(&self) -> SpiderKind {
        SpiderKind::Mikan
    }

    fn record_kind(&self) -> RecordKind {
        RecordKind::Torrent
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
            .map(|entry| {
                let (torrent_url, content_length) = torrent_enclosure(entry);
                let magnet_url = entry
                    .links
                    .iter()
                    .map(|l| l.href.as_str())
                    .find(|href| href.starts_with("magnet:"))
                    .map(str::to_string);
                let page_url = entry
                    .links
                    .iter()
                    .map(|l| l.href.as_str())
                    .find(|href| !href.starts_with("magnet:") && !href.ends_with(".torrent"))
                    .map(str::to_string);

                Record {
                    id: self.only_id(&entry_natural_key(entry)),
                    title: entry.title.as_ref().map(|t| t.content.clone()),
                    content: entry.summary.as_ref().map(|t| t.content.clone()),
                    url: page_url,
                    source: Some(source.clone()),
                    push_time: entry_push_time(entry),
                    extend: None,
                    payload: RecordPayload::Torrent {
                        torrent_url,
                        magnet_url,
                        content_length,
                        category: self.category.clone(),
                    },
                }
            })
            .collect();
        Ok(records)
    }
}

/// Torrent URL and byte length from an item's enclosure.
///
/// RSS enclosures surface as media objects; some feeds also expose the
/// torrent as a plain link.
fn torrent_enclosure(entry: &Entry) -> (Option<String>, u64) {
    for link in &entry.links {
        let is_torrent = link.media_type.as_deref() == Some(TORRENT_MEDIA_TYPE)
            || link.href.ends_with(".torrent");
        if is_torrent {
            return (Some(link.href.clone()), link.length.unwrap_or(0));
        }
    }
    for media in &entry.media {
        for content in &media.content {
            let Some(url) = &content.url else { continue };
            let is_torrent = content
                .content_type
                .as_ref()
                .map(|m| m.essence().to_string() == TORRENT_MEDIA_TYPE)
                .unwrap_or(false)
                || url.path().ends_with(".torrent");
            if is_torrent {
                return (Some(url.to_string()), content.size.unwrap_or(0));
            }
        }
    }
    (None, 0)
}
