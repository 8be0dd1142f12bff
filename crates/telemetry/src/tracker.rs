//! Telemetry tracker.
//!
//! Builds events at the three lifecycle points and hands them to a
//! [`TelemetrySink`]. In [`TelemetryMode::Disabled`] no event is built at
//! all. Dispatch failures are counted and logged, never returned.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use relay_config::TelemetryMode;
use relay_metrics::{Counter, RateLimitedLogger};

use crate::event::{
    ConnectorInitEvent, EventHeader, ExecutionContext, OperationEvent, SessionEndEvent,
    TelemetryEvent,
};
use crate::install::session_scoped_user_id;
use crate::sink::TelemetrySink;

/// Facts about a constructed connector
#[derive(Debug, Clone, Copy)]
pub struct ConnectorInfo<'a> {
    pub connector_name: &'a str,
    pub connector_version: Option<&'a str>,
    pub connector_type: &'a str,
    pub credentials_count: usize,
}

/// How an operation failed
#[derive(Debug, Clone, Copy)]
pub struct OperationFailure<'a> {
    /// Error category, e.g. "Http" or "Timeout"; the only detail sent in anonymous mode
    pub kind: &'a str,
    pub message: &'a str,
}

/// Facts about one completed operation
#[derive(Debug, Clone, Copy)]
pub struct OperationOutcome<'a> {
    pub connector_name: &'a str,
    pub entity: &'a str,
    pub action: &'a str,
    pub duration: Duration,
    pub status_code: Option<u16>,
    pub failure: Option<OperationFailure<'a>>,
}

/// Totals for a finished session
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    pub operation_count: u64,
    pub error_count: u64,
    pub duration: Duration,
}

pub struct TelemetryTracker {
    mode: TelemetryMode,
    install_id: String,
    context: ExecutionContext,
    sink: Option<Arc<dyn TelemetrySink>>,
    events_built: Counter,
    dispatch_failures: Counter,
    failures: RateLimitedLogger,
}

impl TelemetryTracker {
    pub fn new(mode: TelemetryMode, install_id: impl Into<String>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            mode,
            install_id: install_id.into(),
            context: ExecutionContext::collect(),
            sink: (!mode.is_disabled()).then_some(sink),
            events_built: Counter::new(),
            dispatch_failures: Counter::new(),
            failures: RateLimitedLogger::default(),
        }
    }

    /// Tracker that never builds or sends anything
    pub fn disabled() -> Self {
        Self {
            mode: TelemetryMode::Disabled,
            install_id: String::new(),
            context: ExecutionContext::collect(),
            sink: None,
            events_built: Counter::new(),
            dispatch_failures: Counter::new(),
            failures: RateLimitedLogger::default(),
        }
    }

    pub fn mode(&self) -> TelemetryMode {
        self.mode
    }

    /// Number of events constructed so far
    pub fn events_built(&self) -> u64 {
        self.events_built.get()
    }

    pub fn dispatch_failures(&self) -> u64 {
        self.dispatch_failures.get()
    }

    pub fn track_connector_init(&self, session_id: &str, info: ConnectorInfo<'_>) {
        if let Some(event) = self.connector_init_event(session_id, info) {
            self.dispatch(event);
        }
    }

    pub fn track_operation(&self, session_id: &str, outcome: OperationOutcome<'_>) {
        if let Some(event) = self.operation_event(session_id, outcome) {
            self.dispatch(event);
        }
    }

    pub fn track_session_end(&self, session_id: &str, connector_name: &str, stats: SessionStats) {
        if let Some(event) = self.session_end_event(session_id, connector_name, stats) {
            self.dispatch(event);
        }
    }

    /// The init event as it would be sent, `None` when disabled
    pub fn connector_init_event(&self, session_id: &str, info: ConnectorInfo<'_>) -> Option<TelemetryEvent> {
        let header = self.header(session_id)?;
        Some(TelemetryEvent::ConnectorInit(ConnectorInitEvent {
            header,
            connector_name: info.connector_name.to_string(),
            connector_version: info.connector_version.map(str::to_string),
            connector_type: info.connector_type.to_string(),
            credentials_count: info.credentials_count,
        }))
    }

    fn operation_event(&self, session_id: &str, outcome: OperationOutcome<'_>) -> Option<TelemetryEvent> {
        let header = self.header(session_id)?;
        let error = outcome.failure.map(|f| {
            if self.mode.is_anonymous() {
                f.kind.to_string()
            } else {
                format!("{}: {}", f.kind, f.message)
            }
        });
        Some(TelemetryEvent::Operation(OperationEvent {
            header,
            connector_name: outcome.connector_name.to_string(),
            entity: outcome.entity.to_string(),
            action: outcome.action.to_string(),
            duration_ms: outcome.duration.as_secs_f64() * 1000.0,
            success: outcome.failure.is_none(),
            status_code: outcome.status_code,
            error,
        }))
    }

    fn session_end_event(&self, session_id: &str, connector_name: &str, stats: SessionStats) -> Option<TelemetryEvent> {
        let header = self.header(session_id)?;
        Some(TelemetryEvent::SessionEnd(SessionEndEvent {
            header,
            connector_name: connector_name.to_string(),
            operation_count: stats.operation_count,
            error_count: stats.error_count,
            duration_ms: stats.duration.as_secs_f64() * 1000.0,
        }))
    }

    /// Every event is built through here; `None` when disabled
    fn header(&self, session_id: &str) -> Option<EventHeader> {
        if self.mode.is_disabled() {
            return None;
        }
        self.events_built.inc();

        let user_id = match self.mode {
            TelemetryMode::Anonymous => session_scoped_user_id(&self.install_id, session_id),
            _ => self.install_id.clone(),
        };
        Some(EventHeader {
            timestamp: Utc::now(),
            session_id: session_id.to_string(),
            user_id,
            context: self.context.clone(),
        })
    }

    fn dispatch(&self, event: TelemetryEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(e) = sink.send(event.to_map()) {
            self.dispatch_failures.inc();
            self.failures.warn("telemetry dispatch failed", &e);
        }
    }
}

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tracker_test;
