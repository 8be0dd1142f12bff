//! Request log configuration
//!
//! Controls the in-memory window of request/response pairs kept per
//! connector session and where overflowing entries are flushed.

use serde::Deserialize;
use std::path::PathBuf;

/// Default number of entries kept in memory per session
pub const DEFAULT_MAX_LOGS: usize = 10_000;

/// Request log configuration
///
/// # Example
///
/// ```toml
/// [request_log]
/// max_logs = 5000
/// directory = "/var/lib/relay/request_logs"
/// ```
///
/// `unbounded = true` disables eviction entirely. Only use it for sessions
/// whose length is bounded some other way.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestLogConfig {
    /// Entries kept in memory before the oldest are flushed and evicted
    /// Default: 10000
    pub max_logs: usize,

    /// Keep every entry in memory
    /// Default: false
    pub unbounded: bool,

    /// Directory for flushed entries, one JSONL file per session.
    /// Unset keeps logs in memory only and evicted entries are dropped.
    /// Default: "request_logs"
    pub directory: Option<PathBuf>,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            max_logs: DEFAULT_MAX_LOGS,
            unbounded: false,
            directory: Some(PathBuf::from("request_logs")),
        }
    }
}

impl RequestLogConfig {
    /// Effective bound, `None` when unbounded
    pub fn max_logs(&self) -> Option<usize> {
        if self.unbounded {
            None
        } else {
            Some(self.max_logs)
        }
    }
}
