//! Spider variants: pluggable source fetching and parsing.
//!
//! Every spider turns one subscription's raw upstream data into
//! normalized [`domain::Record`]s: `fetch` does the network access,
//! `parse` is a pure transformation, `filter` applies the
//! subscription's keyword rules, and `postprocess` is an optional
//! enrichment hook. Spiders are built per tick from the subscription's
//! dynamic configuration.

mod error;
mod filter;
mod mikan;
mod rss;
mod sslcheck;
mod traits;

pub use error::SpiderError;
pub use filter::apply_keyword_filters;
pub use mikan::MikanSpider;
pub use rss::RssSpider;
pub use sslcheck::SslCheckSpider;
pub use traits::{FetchContext, RawResponse, Spider};

use domain::{CapabilityRegistry, RecordKind, SpiderConfig, SpiderKind};

pub type Result<T> = std::result::Result<T, SpiderError>;

/// Register every spider kind and its record kind.
pub fn register_all(registry: &mut CapabilityRegistry) {
    registry.register_spider(SpiderKind::Rss, RecordKind::Plain);
    registry.register_spider(SpiderKind::Mikan, RecordKind::Torrent);
    registry.register_spider(SpiderKind::SslCheck, RecordKind::Certificate);
}

/// Build a spider instance from a subscription's dynamic configuration.
pub fn build_spider(config: &SpiderConfig) -> Box<dyn Spider> {
    match config {
        SpiderConfig::Rss { url } => Box::new(RssSpider::new(url.clone())),
        SpiderConfig::Mikan { url, category } => {
            Box::new(MikanSpider::new(url.clone(), category.clone()))
        }
        SpiderConfig::SslCheck {
            domains,
            expired_days,
        } => Box::new(SslCheckSpider::new(domains.clone(), expired_days.clone())),
    }
}
