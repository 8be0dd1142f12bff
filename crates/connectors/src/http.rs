//! Logged HTTP transport
//!
//! Every request a connector sends goes through [`LoggedHttpClient`], which
//! records one [`RequestLog`] per call (success or failure) into the
//! session's [`RequestLogger`]. Credential-bearing headers are redacted
//! before the entry is built.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use relay_requestlog::{RequestLog, RequestLogger};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ConnectorError;

/// Headers whose values never reach a request log
pub const REDACTED_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "x-api-key",
    "proxy-authorization",
];

/// Replacement value for redacted headers
pub const REDACTED: &str = "[REDACTED]";

/// Longest response body kept in a log entry
pub const MAX_LOGGED_BODY: usize = 64 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry-After fallback when the header is missing or unparsable
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// A request relative to a connector's base URL
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new("POST", path).json(body)
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A successful (2xx) response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ConnectorError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// HTTP client bound to one base URL and one request logger
#[derive(Clone)]
pub struct LoggedHttpClient {
    client: reqwest::Client,
    base_url: String,
    default_headers: BTreeMap<String, String>,
    logger: Arc<RequestLogger>,
}

impl LoggedHttpClient {
    /// # Errors
    ///
    /// Returns error if HTTP client creation fails (e.g., TLS misconfiguration)
    pub fn new(base_url: impl Into<String>, logger: Arc<RequestLogger>) -> Result<Self, ConnectorError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("relay/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConnectorError::Init(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            default_headers: BTreeMap::new(),
            logger,
        })
    }

    /// Header sent with every request (e.g., authentication)
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn logger(&self) -> &Arc<RequestLogger> {
        &self.logger
    }

    /// Absolute URL for `path`; absolute URLs pass through unchanged
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Send `request`, log it, and map non-2xx statuses to errors
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ConnectorError> {
        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ConnectorError::InvalidRequest(format!("unknown method '{}'", request.method)))?;

        let mut builder = self.client.request(method, self.url_for(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in self.default_headers.iter().chain(&request.headers) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request_body = match &request.body {
            Some(body) => {
                let text = serde_json::to_string(body)?;
                builder = builder
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(text.clone());
                Some(text)
            }
            None => None,
        };
        let http_request = builder
            .build()
            .map_err(|e| ConnectorError::InvalidRequest(e.to_string()))?;

        // Path and query params are derived from the final URL
        let mut entry = RequestLog::builder(http_request.method().as_str(), http_request.url().as_str())
            .headers(redact_headers(http_request.headers()));
        if let Some(body) = request_body {
            entry = entry.request_body(body);
        }

        let start = Instant::now();
        let result = self.execute(http_request).await;
        entry = entry.duration(start.elapsed());

        match result {
            Ok(response) => {
                let logged = truncate_body(&response.body);
                self.logger
                    .record(entry.response(response.status, Some(logged)).build())
                    .await;
                check_status(response)
            }
            Err(e) => {
                self.logger.record(entry.error(e.to_string()).build()).await;
                Err(e)
            }
        }
    }

    async fn execute(&self, request: reqwest::Request) -> Result<ApiResponse, ConnectorError> {
        let response = self.client.execute(request).await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// Map a non-2xx response to the matching error
fn check_status(response: ApiResponse) -> Result<ApiResponse, ConnectorError> {
    match response.status {
        200..=299 => Ok(response),
        401 | 403 => Err(ConnectorError::AuthFailed(response.status)),
        404 => Err(ConnectorError::NotFound(response.body)),
        429 => {
            let retry_after_secs = response
                .headers
                .get("retry-after")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            Err(ConnectorError::RateLimited { retry_after_secs })
        }
        status => Err(ConnectorError::Status {
            status,
            body: response.body,
        }),
    }
}

/// Copy headers for logging, replacing credential values
pub fn redact_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let name = name.as_str().to_string();
            let value = if is_redacted(&name) {
                REDACTED.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name, value)
        })
        .collect()
}

fn is_redacted(name: &str) -> bool {
    REDACTED_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_LOGGED_BODY {
        return body.to_string();
    }
    let mut end = MAX_LOGGED_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated from {} bytes)", &body[..end], body.len())
}

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;
