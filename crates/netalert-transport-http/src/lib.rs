// # HTTP Transport
//
// reqwest-backed implementation of `netalert_core::Transport`.
//
// ## Trust Level: Untrusted (Transport)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS calls to the configured base URL only
// - ✅ Return the status code and raw body of every completed exchange
//
// **Forbidden Capabilities**:
// - ❌ Interpret status codes (owned by AlertClient)
// - ❌ Retry or back off (nothing in netalert retries)
// - ❌ Rate limit (owned by Dispatcher)
// - ❌ Spawn tasks or threads
//
// ## Security Requirements
//
// - The API key travels in the query string; reqwest errors carry the
//   request URL, so every error is stripped of it before it leaves here
// - The Debug implementation does not expose the client internals

use async_trait::async_trait;
use netalert_core::config::ClientConfig;
use netalert_core::traits::{ApiRequest, ApiResponse, Method, Transport};
use netalert_core::{Error, Result};
use std::time::Duration;
use tracing::debug;

/// Transport speaking HTTP to the alert API
#[derive(Clone)]
pub struct HttpTransport {
    /// Base URL without trailing slash
    base_url: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport for `base_url` with a per-request timeout
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: The HTTP client could not be built
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::config("base URL cannot be empty"));
        }

        Ok(Self { base_url, client })
    }

    /// Create a transport from the client configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Map a reqwest failure without leaking the URL (and with it the key)
fn transport_error(err: reqwest::Error) -> Error {
    let err = err.without_url();
    if err.is_timeout() {
        Error::transport(format!("request timed out: {}", err))
    } else if err.is_connect() {
        Error::transport(format!("connection failed: {}", err))
    } else {
        Error::transport(format!("HTTP request failed: {}", err))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(to_reqwest(request.method), self.url(&request.path))
            .query(&request.query);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        debug!(
            method = %request.method,
            path = %request.path,
            status,
            "HTTP exchange completed"
        );

        Ok(ApiResponse::new(status, body))
    }

    fn transport_name(&self) -> &'static str {
        "http"
    }
}
