//! Request log entry
//!
//! One immutable record per HTTP interaction, built when the call completes
//! (success or failure).

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// One HTTP interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLog {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub url: String,
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_params: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestLog {
    /// Start building an entry for `method url`
    pub fn builder(method: impl Into<String>, url: impl Into<String>) -> RequestLogBuilder {
        RequestLogBuilder::new(method.into(), url.into())
    }

    /// Transport error, or a 4xx/5xx response
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.response_status.is_some_and(|s| s >= 400)
    }
}

/// Builder for [`RequestLog`]
///
/// `path` and `query_params` are derived from the URL unless set explicitly.
#[derive(Debug, Clone)]
pub struct RequestLogBuilder {
    timestamp: Option<DateTime<Utc>>,
    method: String,
    url: String,
    path: Option<String>,
    headers: BTreeMap<String, String>,
    query_params: Option<BTreeMap<String, String>>,
    request_body: Option<String>,
    response_status: Option<u16>,
    response_body: Option<String>,
    duration: Duration,
    error: Option<String>,
}

impl RequestLogBuilder {
    fn new(method: String, url: String) -> Self {
        Self {
            timestamp: None,
            method,
            url,
            path: None,
            headers: BTreeMap::new(),
            query_params: None,
            request_body: None,
            response_status: None,
            response_body: None,
            duration: Duration::ZERO,
            error: None,
        }
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn query_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.query_params = Some(params);
        self
    }

    #[must_use]
    pub fn request_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = Some(body.into());
        self
    }

    #[must_use]
    pub fn response(mut self, status: u16, body: Option<String>) -> Self {
        self.response_status = Some(status);
        self.response_body = body;
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn build(self) -> RequestLog {
        let (derived_path, derived_query) = path_and_query(&self.url);
        RequestLog {
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            method: self.method.to_ascii_uppercase(),
            path: self.path.unwrap_or(derived_path),
            query_params: self.query_params.or(derived_query),
            url: self.url,
            headers: self.headers,
            request_body: self.request_body,
            response_status: self.response_status,
            response_body: self.response_body,
            duration_ms: self.duration.as_secs_f64() * 1000.0,
            error: self.error,
        }
    }
}

/// Resolves relative URLs; only the path and query are read back
const RELATIVE_BASE: &str = "http://relative.invalid";

/// Path and percent-decoded query parameters of an absolute or relative URL
fn path_and_query(raw: &str) -> (String, Option<BTreeMap<String, String>>) {
    let parsed = match Url::parse(raw) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(RELATIVE_BASE).and_then(|base| base.join(raw))
        }
        other => other,
    };
    let Ok(url) = parsed else {
        return ("/".to_string(), None);
    };

    let params = url
        .query()
        .filter(|q| !q.is_empty())
        .map(|_| {
            url.query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        });
    (url.path().to_string(), params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_derives_path_and_query() {
        let log = RequestLog::builder("get", "https://api.github.com/repos/a/b/issues?state=open&per_page=50")
            .response(200, Some("[]".into()))
            .duration(Duration::from_millis(12))
            .build();

        assert_eq!(log.method, "GET");
        assert_eq!(log.path, "/repos/a/b/issues");
        let params = log.query_params.as_ref().unwrap();
        assert_eq!(params["state"], "open");
        assert_eq!(params["per_page"], "50");
        assert_eq!(log.duration_ms, 12.0);
        assert!(!log.is_error());
    }

    #[test]
    fn test_path_and_query_edge_cases() {
        assert_eq!(path_and_query("https://example.com"), ("/".to_string(), None));
        assert_eq!(path_and_query("https://example.com?"), ("/".to_string(), None));
        assert_eq!(path_and_query("/v1/items#top"), ("/v1/items".to_string(), None));
        assert_eq!(path_and_query("http://[::1"), ("/".to_string(), None));

        let (path, params) = path_and_query("https://example.com/x?flag&k=v");
        assert_eq!(path, "/x");
        let params = params.unwrap();
        assert_eq!(params["flag"], "");
        assert_eq!(params["k"], "v");
    }

    #[test]
    fn test_query_values_are_percent_decoded() {
        let log = RequestLog::builder("GET", "https://x.com/a%20b?q=hello%20world&tag=a%26b&s=c+d").build();
        assert_eq!(log.path, "/a%20b");
        let params = log.query_params.unwrap();
        assert_eq!(params["q"], "hello world");
        assert_eq!(params["tag"], "a&b");
        assert_eq!(params["s"], "c d");

        let relative = RequestLog::builder("GET", "/search?q=%C3%A9t%C3%A9").build();
        assert_eq!(relative.path, "/search");
        assert_eq!(relative.query_params.unwrap()["q"], "été");
    }

    #[test]
    fn test_explicit_path_wins() {
        let log = RequestLog::builder("POST", "https://example.com/a")
            .path("/override")
            .query_params(BTreeMap::from([("x".into(), "1".into())]))
            .build();
        assert_eq!(log.path, "/override");
        assert_eq!(log.query_params.unwrap()["x"], "1");
    }

    #[test]
    fn test_is_error() {
        let failed = RequestLog::builder("GET", "https://example.com")
            .error("connection refused")
            .build();
        assert!(failed.is_error());

        let not_found = RequestLog::builder("GET", "https://example.com")
            .response(404, None)
            .build();
        assert!(not_found.is_error());
    }

    #[test]
    fn test_serializes_rfc3339_and_skips_empty() {
        let ts = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let log = RequestLog::builder("GET", "https://example.com/a")
            .timestamp(ts)
            .build();

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["timestamp"], "2026-01-02T03:04:05Z");
        assert!(json.get("response_body").is_none());
        assert!(json.get("error").is_none());
    }
}
