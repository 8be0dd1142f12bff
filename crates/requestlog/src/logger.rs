//! Request logger
//!
//! Owns one [`LogSession`] and enforces its size limit with flush-then-evict:
//! entries leave memory only after the sink acknowledged them.
//!
//! # Locking
//!
//! - `state` (sync) guards the buffer and is held only for short mutations,
//!   never across sink I/O. Appends take only this lock.
//! - `gate` (async) admits one flusher at a time. `record` only tries it: if
//!   a flush is already in flight the entry stays in memory (the buffer may
//!   briefly exceed its limit) and the flusher picks it up before it stops.
//!   `flush` and `end_session` wait for it.
//!
//! `flushed` is a cursor: the first `flushed` entries in the buffer are
//! already on the sink. Flushing writes `[flushed..]`; eviction drops from
//! the front and shifts the cursor. Only the gate holder advances it, so
//! entries in flight always sit at `[flushed..flushed + n]`.

use std::sync::Arc;

use parking_lot::Mutex;
use relay_metrics::{Counter, RateLimitedLogger};
use serde::Serialize;
use tracing::{debug, warn};

use crate::entry::RequestLog;
use crate::error::Result;
use crate::session::LogSession;
use crate::sink::FlushSink;

struct LoggerState {
    session: LogSession,
    flushed: usize,
    closed: bool,
    total_recorded: u64,
    failed_requests: u64,
    total_duration_ms: f64,
}

impl LoggerState {
    fn account(&mut self, entry: &RequestLog) {
        self.total_recorded += 1;
        self.total_duration_ms += entry.duration_ms;
        if entry.is_error() {
            self.failed_requests += 1;
        }
    }

    /// Entries above the limit, oldest first
    fn overflow(&self) -> usize {
        match self.session.max_logs() {
            Some(max) => self.session.len().saturating_sub(max),
            None => 0,
        }
    }

    /// Drop `count` front entries that are already on the sink
    fn evict_flushed(&mut self, count: usize) -> usize {
        let count = count.min(self.flushed);
        self.session.evict_front(count);
        self.flushed -= count;
        count
    }

    /// Overflow that has not reached the sink yet
    fn unflushed_overflow(&self) -> bool {
        self.overflow() > self.flushed
    }
}

enum RecordStep {
    Done,
    WriteThrough(RequestLog),
    /// Overflow must reach the sink before it can be evicted
    Flush,
}

/// How far a flush goes before it stops
#[derive(Clone, Copy, PartialEq, Eq)]
enum Drain {
    /// Only entries above the limit
    Overflow,
    /// Every unflushed entry
    All,
    /// Every unflushed entry, then close the session
    Close,
}

/// Logger counters
#[derive(Debug, Default)]
pub struct LoggerMetrics {
    /// Entries acknowledged by the sink
    pub flushed: Counter,
    /// Entries removed from memory after a flush
    pub evicted: Counter,
    /// Entries discarded without reaching a sink
    pub dropped: Counter,
    /// Sink writes that failed
    pub flush_failures: Counter,
}

/// Point-in-time copy of [`LoggerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoggerMetricsSnapshot {
    pub flushed: u64,
    pub evicted: u64,
    pub dropped: u64,
    pub flush_failures: u64,
}

impl LoggerMetrics {
    pub fn snapshot(&self) -> LoggerMetricsSnapshot {
        LoggerMetricsSnapshot {
            flushed: self.flushed.get(),
            evicted: self.evicted.get(),
            dropped: self.dropped.get(),
            flush_failures: self.flush_failures.get(),
        }
    }
}

/// Aggregate view of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_name: Option<String>,
    /// Every entry ever recorded, including flushed and evicted ones
    pub total_recorded: u64,
    pub in_memory: usize,
    /// Entries acknowledged by the sink
    pub flushed: u64,
    pub failed_requests: u64,
    pub avg_duration_ms: f64,
    pub closed: bool,
}

pub struct RequestLogger {
    state: Mutex<LoggerState>,
    gate: tokio::sync::Mutex<()>,
    sink: Option<Arc<dyn FlushSink>>,
    metrics: LoggerMetrics,
    failures: RateLimitedLogger,
}

impl RequestLogger {
    /// Logger without a sink: overflow is dropped instead of flushed
    pub fn new(session: LogSession) -> Self {
        Self {
            state: Mutex::new(LoggerState {
                session,
                flushed: 0,
                closed: false,
                total_recorded: 0,
                failed_requests: 0,
                total_duration_ms: 0.0,
            }),
            gate: tokio::sync::Mutex::new(()),
            sink: None,
            metrics: LoggerMetrics::default(),
            failures: RateLimitedLogger::default(),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn FlushSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_failure_logger(mut self, failures: RateLimitedLogger) -> Self {
        self.failures = failures;
        self
    }

    /// Append one entry
    ///
    /// When the buffer exceeds its limit the oldest unflushed entries are
    /// written to the sink first and evicted only on success. A failed
    /// flush keeps everything in memory (the buffer temporarily exceeds its
    /// limit) and is retried by the next record or flush. Appending never
    /// waits on sink I/O started by another caller.
    ///
    /// After [`end_session`](Self::end_session) entries go straight to the
    /// sink.
    pub async fn record(&self, entry: RequestLog) {
        let step = {
            let mut state = self.state.lock();
            state.account(&entry);

            if state.closed {
                RecordStep::WriteThrough(entry)
            } else {
                state.session.push(entry);
                self.plan_eviction(&mut state)
            }
        };

        match step {
            RecordStep::Done => {}
            RecordStep::WriteThrough(entry) => self.write_through(entry).await,
            RecordStep::Flush => self.flush_overflow().await,
        }
    }

    fn plan_eviction(&self, state: &mut LoggerState) -> RecordStep {
        let overflow = state.overflow();
        if overflow == 0 {
            return RecordStep::Done;
        }

        // Overflow that is already on the sink needs no I/O
        let evicted = state.evict_flushed(overflow);
        self.metrics.evicted.add(evicted as u64);
        let remaining = overflow - evicted;
        if remaining == 0 {
            return RecordStep::Done;
        }

        if self.sink.is_none() {
            state.session.evict_front(remaining);
            self.metrics.dropped.add(remaining as u64);
            return RecordStep::Done;
        }

        RecordStep::Flush
    }

    /// Flush overflow unless another flusher holds the gate
    ///
    /// Whoever releases the gate checks again, so overflow appended while a
    /// flush was in flight is never stranded.
    async fn flush_overflow(&self) {
        if self.sink.is_none() {
            return;
        }
        while self.state.lock().unflushed_overflow() {
            let Ok(_gate) = self.gate.try_lock() else {
                return;
            };
            if self.drain(Drain::Overflow).await.is_err() {
                return;
            }
        }
    }

    /// Write every unflushed entry to the sink
    ///
    /// Returns the number of newly flushed entries; a second call with no
    /// record in between returns 0. Without a sink this is a no-op.
    pub async fn flush(&self) -> Result<usize> {
        let flushed = {
            let _gate = self.gate.lock().await;
            self.drain(Drain::All).await?
        };
        self.flush_overflow().await;
        Ok(flushed)
    }

    /// Final flush, then close the session
    ///
    /// Safe to call repeatedly; calls after a successful close return
    /// `Ok(0)`. If the final flush fails the session stays open so the
    /// caller may retry.
    pub async fn end_session(&self) -> Result<usize> {
        let flushed = {
            let _gate = self.gate.lock().await;
            if self.state.lock().closed {
                return Ok(0);
            }
            self.drain(Drain::Close).await?
        };
        self.flush_overflow().await;
        Ok(flushed)
    }

    /// Write unflushed entries until `mode` is satisfied; caller holds `gate`
    ///
    /// Entries appended while a batch is in flight are picked up by the next
    /// round. `Drain::Close` closes the session under the same lock that
    /// observed nothing left to flush.
    async fn drain(&self, mode: Drain) -> Result<usize> {
        let mut total = 0;
        loop {
            let batch = {
                let mut state = self.state.lock();
                let end = match (&self.sink, mode) {
                    (None, _) => state.flushed,
                    (Some(_), Drain::Overflow) => state.overflow(),
                    (Some(_), Drain::All | Drain::Close) => state.session.len(),
                };

                if state.flushed >= end {
                    let overflow = state.overflow();
                    let evicted = state.evict_flushed(overflow);
                    self.metrics.evicted.add(evicted as u64);
                    if mode == Drain::Close {
                        self.close(&mut state, total);
                    }
                    return Ok(total);
                }

                let start = state.flushed;
                state.session.logs().range(start..end).cloned().collect::<Vec<_>>()
            };

            let Some(sink) = &self.sink else {
                return Ok(total);
            };
            if let Err(e) = sink.write_batch(&batch).await {
                self.metrics.flush_failures.inc();
                self.failures.warn("request log flush failed", &e);
                return Err(e);
            }
            self.metrics.flushed.add(batch.len() as u64);
            self.state.lock().flushed += batch.len();
            total += batch.len();
        }
    }

    fn close(&self, state: &mut LoggerState, flushed: usize) {
        state.closed = true;
        state.session.mark_ended();
        debug!(
            session_id = state.session.session_id(),
            total_recorded = state.total_recorded,
            flushed,
            "request log session ended"
        );
    }

    async fn write_through(&self, entry: RequestLog) {
        let Some(sink) = &self.sink else {
            self.metrics.dropped.inc();
            warn!(
                method = %entry.method,
                path = %entry.path,
                "request recorded after session end with no sink, dropping"
            );
            return;
        };
        match sink.write_batch(std::slice::from_ref(&entry)).await {
            Ok(()) => self.metrics.flushed.inc(),
            Err(e) => {
                self.metrics.flush_failures.inc();
                self.metrics.dropped.inc();
                self.failures.warn("request log flush failed", &e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn session_id(&self) -> String {
        self.state.lock().session.session_id().to_string()
    }

    pub fn connector_name(&self) -> Option<String> {
        self.state.lock().session.connector_name().map(str::to_string)
    }

    pub fn set_connector_name(&self, name: impl Into<String>) {
        self.state.lock().session.set_connector_name(name);
    }

    pub fn max_logs(&self) -> Option<usize> {
        self.state.lock().session.max_logs()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Entries currently in memory
    pub fn len(&self) -> usize {
        self.state.lock().session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().session.is_empty()
    }

    /// In-memory entries not yet on the sink
    pub fn unflushed(&self) -> usize {
        let state = self.state.lock();
        state.session.len() - state.flushed
    }

    /// Copy of the in-memory window, oldest first
    pub fn entries(&self) -> Vec<RequestLog> {
        self.state.lock().session.logs().iter().cloned().collect()
    }

    /// Up to `n` most recent entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<RequestLog> {
        let state = self.state.lock();
        let logs = state.session.logs();
        logs.range(logs.len().saturating_sub(n)..).cloned().collect()
    }

    /// In-memory entries that failed or returned 4xx/5xx
    pub fn errors(&self) -> Vec<RequestLog> {
        self.find(RequestLog::is_error)
    }

    pub fn find(&self, predicate: impl Fn(&RequestLog) -> bool) -> Vec<RequestLog> {
        self.state
            .lock()
            .session
            .logs()
            .iter()
            .filter(|entry| predicate(entry))
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> SessionSummary {
        let state = self.state.lock();
        let avg_duration_ms = if state.total_recorded == 0 {
            0.0
        } else {
            state.total_duration_ms / state.total_recorded as f64
        };
        SessionSummary {
            session_id: state.session.session_id().to_string(),
            connector_name: state.session.connector_name().map(str::to_string),
            total_recorded: state.total_recorded,
            in_memory: state.session.len(),
            flushed: self.metrics.flushed.get(),
            failed_requests: state.failed_requests,
            avg_duration_ms,
            closed: state.closed,
        }
    }

    /// The session (metadata and in-memory window) as pretty JSON
    pub fn export_json(&self) -> Result<String> {
        let state = self.state.lock();
        Ok(serde_json::to_string_pretty(&state.session)?)
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }
}

#[cfg(test)]
#[path = "logger_test.rs"]
mod logger_test;
