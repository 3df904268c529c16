use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpiderError {
    /// Network-level failure; the tick is aborted and retried on the next
    /// scheduled run.
    #[error("fetch failed: {0}")]
    Fetch(#[from] fetch::FetchError),

    /// Malformed upstream payload; never fatal to the process.
    #[error("parse failed: {0}")]
    Parse(String),
}
