// # Transport Trait
//
// Defines the interface for issuing a single HTTP exchange against the
// alert API.
//
// ## Implementations
//
// - reqwest-based: `netalert-transport-http` crate
// - Tests: in-memory fakes of the remote service
//
// ## Usage
//
// ```rust,ignore
// use netalert_core::traits::{ApiRequest, Method, Transport};
//
// let transport = /* Transport implementation */;
// let response = transport
//     .send(ApiRequest::new(Method::Get, "/shodan/alert/ABC/info"))
//     .await?;
// assert_eq!(response.status, 200);
// ```

use async_trait::async_trait;
use std::fmt;

/// HTTP method used by the alert API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameter that carries the API credential
pub const CREDENTIAL_PARAM: &str = "key";

/// A request to the alert API, relative to the transport's base URL
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append a query parameter
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query parameter by name
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

// The credential rides in the query string; keep it out of Debug output.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query: Vec<(&str, &str)> = self
            .query
            .iter()
            .map(|(k, v)| {
                if k == CREDENTIAL_PARAM {
                    (k.as_str(), "<REDACTED>")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();

        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &query)
            .field("body", &self.body)
            .finish()
    }
}

/// Raw response from the alert API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Trait for transport implementations
///
/// A transport performs exactly one HTTP exchange per call.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS calls to the configured base URL only
/// - ✅ Return the raw status and body for every completed exchange
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (no retries anywhere in netalert)
/// - ❌ Throttle (owned by `Dispatcher`)
/// - ❌ Interpret status codes (owned by `AlertClient`)
/// - ❌ Log or echo the `key` query parameter
///
/// A non-2xx response is NOT an error at this layer: it must come back as an
/// `ApiResponse` so the client can surface status and body verbatim.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the raw response
    ///
    /// # Returns
    ///
    /// - `Ok(ApiResponse)`: The exchange completed (any status)
    /// - `Err(Error::Transport)`: Request construction or connection failed
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, crate::Error>;

    /// Get the transport name (for logging/debugging)
    fn transport_name(&self) -> &'static str;
}
