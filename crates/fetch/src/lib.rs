//! HTTP fetch collaborator.
//!
//! Thin wrapper over reqwest providing the narrow contract the rest of
//! the system relies on: `fetch(url, proxy?) -> {status_code, body,
//! headers}`, failing with a small error taxonomy. Proxy configuration
//! is per-call so a subscription's `enable_proxy` flag can be honored
//! without rebuilding collaborators.

mod client;
mod error;

pub use client::{HttpClient, Response};
pub use error::FetchError;

pub type Result<T> = std::result::Result<T, FetchError>;
