//! Resilient HTTP transport.
//!
//! The only network boundary of the engine. Every call goes through
//! [`HttpTransport::request`], which retries transient failures with
//! exponential backoff:
//!
//! - 2xx → success.
//! - 4xx other than 429 → [`SyncError::Client`] at once; the request is
//!   presumed invalid and retrying would not help.
//! - 429, 5xx, any other status, or a connection-level failure → wait
//!   `backoff`, then retry with one retry fewer and double the backoff.
//!   No jitter and no cap: callers bound latency through `max_retries`.
//!
//! With the defaults (3 retries, 1000 ms) the waits are 1000, 2000, 4000 ms.

use crate::error::{SyncError, SyncResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry budget for a single logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry. Must be non-zero.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Upper bound on the total time spent sleeping between attempts:
    /// `initial_backoff * (2^max_retries - 1)`.
    pub fn max_total_backoff(&self) -> Duration {
        let factor = 2u32
            .checked_pow(self.max_retries)
            .map_or(u32::MAX, |f| f.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub retry: RetryPolicy,
    /// Per-attempt timeout enforced by the HTTP client.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("linkman-sync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// An owned description of a request, rebuilt for every attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Appends a query pair. Encoding happens when the request is sent.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Sets a JSON body and the matching content type.
    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self.header("Content-Type", "application/json")
    }

    /// Validates URL and headers once, before any attempt is made.
    fn prepare(&self) -> SyncResult<(Url, HeaderMap)> {
        let url = Url::parse(&self.url)
            .map_err(|e| SyncError::Config(format!("invalid URL {:?}: {e}", self.url)))?;

        let mut headers = HeaderMap::new();
        for (key, value) in &self.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| SyncError::Config(format!("invalid header name {key:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SyncError::Config(format!("invalid value for header {key}: {e}")))?;
            headers.insert(name, value);
        }
        Ok((url, headers))
    }
}

/// Statuses that fail immediately.
fn is_non_retryable(status: StatusCode) -> bool {
    status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS
}

/// HTTP transport with bounded exponential-backoff retry.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Creates a transport from its configuration.
    pub fn new(config: TransportConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry: config.retry,
        })
    }

    /// Sends `req` with this transport's default retry policy.
    pub async fn request(&self, req: &HttpRequest) -> SyncResult<Response> {
        self.request_with(req, self.retry.max_retries, self.retry.initial_backoff)
            .await
    }

    /// Sends `req`, retrying retryable failures up to `max_retries` times
    /// starting at `initial_backoff`.
    pub async fn request_with(
        &self,
        req: &HttpRequest,
        max_retries: u32,
        initial_backoff: Duration,
    ) -> SyncResult<Response> {
        if initial_backoff.is_zero() {
            return Err(SyncError::Config("initial backoff must be positive".to_string()));
        }
        let (url, headers) = req.prepare()?;

        let mut retries = max_retries;
        let mut backoff = initial_backoff;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            debug!("{} {} (attempt {})", req.method, url, attempts);

            let last = match self.send_once(req, &url, &headers).await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if is_non_retryable(status) {
                        let body = response.text().await.unwrap_or_default();
                        return Err(SyncError::Client {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    format!("status {status}")
                }
                Err(e) if e.is_builder() => {
                    return Err(SyncError::Network(format!("failed to build request: {e}")));
                }
                Err(e) => e.to_string(),
            };

            if retries == 0 {
                return Err(SyncError::RetriesExhausted { attempts, last });
            }

            warn!(
                "{} {} failed ({}), retrying in {:?} ({} retries left)",
                req.method, url, last, backoff, retries
            );
            tokio::time::sleep(backoff).await;
            retries -= 1;
            backoff = backoff.saturating_mul(2);
        }
    }

    async fn send_once(
        &self,
        req: &HttpRequest,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<Response, reqwest::Error> {
        let mut builder = self
            .client
            .request(req.method.clone(), url.clone())
            .headers(headers.clone());
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(body) = &req.body {
            builder = builder.body(body.to_string());
        }
        builder.send().await
    }
}
