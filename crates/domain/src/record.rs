//! The normalized unit of observed content.
//!
//! A [`Record`] is created by a spider's parse step, is immutable
//! afterwards, and is persisted once confirmed new. Its `id` is the
//! deduplication key and is conventionally `{spider_prefix}_{natural_key}`.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::capability::{Capability, RecordKind};

/// One observed unit of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Unique within a subscription, format `{prefix}_{natural_key}`.
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    /// Milliseconds since epoch, assigned at parse time.
    pub push_time: i64,
    /// Free-form source-specific payload, opaque to the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend: Option<Map<String, Value>>,
    /// Variant-specific data, tagged for round-trip deserialization.
    #[serde(flatten)]
    pub payload: RecordPayload,
}

/// Variant-specific record data.
///
/// The discriminator is written into the persisted form so stored history
/// deserializes back into the correct variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "__type__")]
pub enum RecordPayload {
    #[default]
    Plain,
    Torrent {
        #[serde(default)]
        torrent_url: Option<String>,
        #[serde(default)]
        magnet_url: Option<String>,
        #[serde(default)]
        content_length: u64,
        /// Grouping label used when building download paths, e.g. a show
        /// name. Filled by enrichment when available.
        #[serde(default)]
        category: Option<String>,
    },
    Certificate {
        probes: Vec<CertProbe>,
    },
}

/// Result of probing one host's TLS certificate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertProbe {
    pub hostname: String,
    /// Validity start, milliseconds since epoch.
    #[serde(default)]
    pub not_before: Option<i64>,
    /// Validity end, milliseconds since epoch.
    #[serde(default)]
    pub not_after: Option<i64>,
    #[serde(default)]
    pub expired: Option<bool>,
    /// Probe failure description, if the certificate could not be read.
    #[serde(default)]
    pub error: Option<String>,
}

/// What an offline-download action should submit for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Magnet link or torrent file URL.
    pub file_url: String,
    /// Save path relative to the deployment's download root.
    pub save_path: String,
}

impl Record {
    pub fn record_kind(&self) -> RecordKind {
        match self.payload {
            RecordPayload::Plain => RecordKind::Plain,
            RecordPayload::Torrent { .. } => RecordKind::Torrent,
            RecordPayload::Certificate { .. } => RecordKind::Certificate,
        }
    }

    pub fn capabilities(&self) -> &'static [Capability] {
        self.record_kind().capabilities()
    }

    /// Render this record as an HTML chat message.
    ///
    /// Returns `None` when the record kind does not implement
    /// [`Capability::ChatMessage`].
    pub fn chat_message_text(&self) -> Option<String> {
        if !self.capabilities().contains(&Capability::ChatMessage) {
            return None;
        }

        let mut text = String::new();
        if let Some(source) = &self.source {
            text.push_str(&format!("<i>{source}</i>\n"));
        }
        text.push_str(&format!("{}\n\n", human_time(self.push_time)));

        let content = self.content.as_deref().unwrap_or("");
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            // Skip the title when the content already leads with it.
            if !content.starts_with(title) {
                text.push_str(&format!("<b>{title}</b>\n"));
            }
        }
        if !content.is_empty() {
            text.push_str(&format!("{content}\n\n"));
        }

        if let RecordPayload::Torrent {
            torrent_url,
            magnet_url,
            content_length,
            ..
        } = &self.payload
        {
            if let Some(magnet) = magnet_url {
                text.push_str(&format!("<code>{magnet}</code>\n"));
            }
            if *content_length > 0 {
                text.push_str(&format!("Size: {}\n", format_size(*content_length)));
            }
            if let Some(torrent) = torrent_url {
                text.push_str(&format!("<a href='{torrent}'>Torrent</a>  "));
            }
        }

        if let Some(url) = &self.url {
            text.push_str(&format!("<a href='{url}'>Open</a>"));
        }
        Some(text)
    }

    /// Build the offline-download request for this record.
    ///
    /// Returns `None` when the record kind does not implement
    /// [`Capability::OfflineDownload`] or carries no usable URL.
    pub fn download_request(&self) -> Option<DownloadRequest> {
        let RecordPayload::Torrent {
            torrent_url,
            magnet_url,
            category,
            ..
        } = &self.payload
        else {
            return None;
        };
        let file_url = magnet_url.clone().or_else(|| torrent_url.clone())?;
        let group = category
            .as_deref()
            .or(self.source.as_deref())
            .unwrap_or("uncategorized");
        Some(DownloadRequest {
            file_url,
            save_path: format!("{}/{}", quarter(self.push_time), group),
        })
    }
}

/// Human-readable local time from a millisecond timestamp.
pub fn human_time(push_time: i64) -> String {
    match Local.timestamp_millis_opt(push_time).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => push_time.to_string(),
    }
}

/// Year and quarter label, used for download path grouping.
fn quarter(push_time: i64) -> String {
    match Local.timestamp_millis_opt(push_time).single() {
        Some(t) => {
            use chrono::Datelike;
            format!("{}Q{}", t.year(), (t.month0() / 3) + 1)
        }
        None => "unknown".to_string(),
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torrent_record() -> Record {
        Record {
            id: "MikanSpider_abc".to_string(),
            title: Some("Episode 12".to_string()),
            content: Some("Episode 12 release notes".to_string()),
            url: Some("https://example.com/ep12".to_string()),
            source: Some("feed1".to_string()),
            push_time: 1_700_000_000_000,
            extend: None,
            payload: RecordPayload::Torrent {
                torrent_url: Some("https://example.com/ep12.torrent".to_string()),
                magnet_url: Some("magnet:?xt=urn:btih:abc".to_string()),
                content_length: 734_003_200,
                category: Some("Show".to_string()),
            },
        }
    }

    #[test]
    fn payload_discriminator_round_trips() {
        let record = torrent_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["__type__"], "Torrent");

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back.record_kind(), RecordKind::Torrent);
        assert_eq!(back.id, record.id);
    }

    #[test]
    fn download_request_prefers_magnet() {
        let req = torrent_record().download_request().unwrap();
        assert_eq!(req.file_url, "magnet:?xt=urn:btih:abc");
        assert!(req.save_path.ends_with("/Show"));
    }

    #[test]
    fn plain_record_has_no_download_request() {
        let record = Record {
            id: "RssSpider_x".to_string(),
            title: None,
            content: None,
            url: None,
            source: None,
            push_time: 0,
            extend: None,
            payload: RecordPayload::Plain,
        };
        assert!(record.download_request().is_none());
    }

    #[test]
    fn chat_message_skips_redundant_title() {
        let mut record = torrent_record();
        record.content = Some("Episode 12 release notes".to_string());
        let text = record.chat_message_text().unwrap();
        assert!(!text.contains("<b>"));

        record.content = Some("Something else".to_string());
        let text = record.chat_message_text().unwrap();
        assert!(text.contains("<b>Episode 12</b>"));
    }

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
    }
}
