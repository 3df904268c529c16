use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid proxy '{0}'")]
    Proxy(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Map a reqwest error onto the fetch taxonomy.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_connect() {
            FetchError::Connect {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else {
            FetchError::Request(err.to_string())
        }
    }
}
