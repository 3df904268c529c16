use async_trait::async_trait;

use domain::{CertProbe, Record, RecordKind, SpiderKind, Subscription};

use crate::filter::apply_keyword_filters;

/// Per-tick fetch environment derived from deployment config and the
/// subscription's `enable_proxy` flag.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    /// Proxy (host:port) to route through, already gated on
    /// `enable_proxy`.
    pub proxy: Option<String>,
}

/// Raw data produced by a spider's fetch stage, consumed by its parse
/// stage.
#[derive(Debug)]
pub enum RawResponse {
    Http(fetch::Response),
    Probes(Vec<CertProbe>),
}

/// A pluggable source component for one subscription.
#[async_trait]
pub trait Spider: Send + Sync {
    fn kind(&self) -> SpiderKind;

    /// Record kind this spider produces; drives action compatibility.
    fn record_kind(&self) -> RecordKind;

    /// Deterministic record id, stable across restarts for the same
    /// natural key.
    fn only_id(&self, natural_key: &str) -> String {
        format!("{}_{}", self.kind().prefix(), natural_key)
    }

    /// Fetch raw data. Must honor the context's proxy setting.
    async fn fetch(&self, subscription: &Subscription, ctx: &FetchContext)
        -> crate::Result<RawResponse>;

    /// Pure transformation of raw data into records. Malformed upstream
    /// data becomes a `SpiderError::Parse`, never a panic.
    fn parse(&self, subscription: &Subscription, raw: &RawResponse) -> crate::Result<Vec<Record>>;

    /// Apply the subscription's white/black keyword rules. Deny overrides
    /// allow.
    fn filter(&self, records: Vec<Record>, subscription: &Subscription) -> Vec<Record> {
        apply_keyword_filters(records, subscription)
    }

    /// Optional enrichment hook. Enrichment failures must leave fields
    /// unset rather than drop records.
    async fn postprocess(
        &self,
        records: Vec<Record>,
        _subscription: &Subscription,
    ) -> Vec<Record> {
        records
    }
}
