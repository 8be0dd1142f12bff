//! Log session
//!
//! Ordered container of [`RequestLog`] entries for one connector session.
//! The session stores what it is given; the size limit is enforced by
//! [`RequestLogger`](crate::RequestLogger).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use relay_config::DEFAULT_MAX_LOGS;
use serde::Serialize;
use uuid::Uuid;

use crate::entry::RequestLog;

#[derive(Debug, Clone, Serialize)]
pub struct LogSession {
    session_id: String,
    started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connector_name: Option<String>,
    /// `None` means unbounded
    max_logs: Option<usize>,
    logs: VecDeque<RequestLog>,
}

impl LogSession {
    /// Bounded session with [`DEFAULT_MAX_LOGS`]
    pub fn new(connector_name: Option<String>) -> Self {
        Self::with_limit(connector_name, Some(DEFAULT_MAX_LOGS))
    }

    /// Session with an explicit limit; `None` disables eviction
    ///
    /// Unbounded sessions grow for as long as the session lives and are not
    /// suitable for long-running production use.
    pub fn with_limit(connector_name: Option<String>, max_logs: Option<usize>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            ended_at: None,
            connector_name,
            max_logs,
            logs: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn connector_name(&self) -> Option<&str> {
        self.connector_name.as_deref()
    }

    /// Name reported by the connector, known only once it is constructed
    pub fn set_connector_name(&mut self, name: impl Into<String>) {
        self.connector_name = Some(name.into());
    }

    pub fn max_logs(&self) -> Option<usize> {
        self.max_logs
    }

    pub fn is_bounded(&self) -> bool {
        self.max_logs.is_some()
    }

    pub fn logs(&self) -> &VecDeque<RequestLog> {
        &self.logs
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub(crate) fn push(&mut self, entry: RequestLog) {
        self.logs.push_back(entry);
    }

    /// Remove the `count` oldest entries
    pub(crate) fn evict_front(&mut self, count: usize) {
        let count = count.min(self.logs.len());
        self.logs.drain(..count);
    }

    pub(crate) fn mark_ended(&mut self) {
        self.ended_at.get_or_insert_with(Utc::now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> RequestLog {
        RequestLog::builder("GET", format!("https://example.com{path}")).build()
    }

    #[test]
    fn test_defaults() {
        let session = LogSession::new(Some("github".into()));
        assert_eq!(session.max_logs(), Some(DEFAULT_MAX_LOGS));
        assert_eq!(session.connector_name(), Some("github"));
        assert!(session.is_empty());
        assert!(session.ended_at().is_none());
        assert!(Uuid::parse_str(session.session_id()).is_ok());
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(
            LogSession::new(None).session_id(),
            LogSession::new(None).session_id()
        );
    }

    #[test]
    fn test_evict_front_keeps_order() {
        let mut session = LogSession::with_limit(None, None);
        for p in ["/a", "/b", "/c"] {
            session.push(entry(p));
        }
        session.evict_front(2);
        assert_eq!(session.len(), 1);
        assert_eq!(session.logs()[0].path, "/c");

        session.evict_front(5);
        assert!(session.is_empty());
    }

    #[test]
    fn test_mark_ended_is_sticky() {
        let mut session = LogSession::new(None);
        session.mark_ended();
        let first = session.ended_at();
        session.mark_ended();
        assert_eq!(session.ended_at(), first);
    }
}
