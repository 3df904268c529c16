use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::FetchError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("perch/", env!("CARGO_PKG_VERSION"));

/// Unified response model.
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

impl Response {
    /// 2xx is success.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// HTTP client wrapper with per-call proxy support.
#[derive(Debug, Clone)]
pub struct HttpClient {
    timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Build a reqwest client, routing through `proxy` (host:port) when set.
    fn build(&self, proxy: Option<&str>) -> crate::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(format!("http://{proxy}"))
                .map_err(|e| FetchError::Proxy(format!("{proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))
    }

    pub async fn get(&self, url: &str, proxy: Option<&str>) -> crate::Result<Response> {
        let client = self.build(proxy)?;
        tracing::debug!("GET {}", url);
        let resp = client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        Self::into_response(url, resp).await
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        proxy: Option<&str>,
    ) -> crate::Result<Response> {
        let client = self.build(proxy)?;
        tracing::debug!("POST {}", url);
        let resp = client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        Self::into_response(url, resp).await
    }

    async fn into_response(url: &str, resp: reqwest::Response) -> crate::Result<Response> {
        let status_code = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        Ok(Response {
            status_code,
            body,
            headers,
        })
    }
}
