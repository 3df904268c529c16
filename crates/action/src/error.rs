use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("chat transport error: {0}")]
    Transport(String),

    #[error("downloader error: {0}")]
    Downloader(String),
}
