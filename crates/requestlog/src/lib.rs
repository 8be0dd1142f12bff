//! Relay - Request Log
//!
//! Bounded record of the HTTP interactions of one connector session.
//!
//! # Flush, Then Evict
//!
//! A [`RequestLogger`] keeps at most `max_logs` entries in memory. When a
//! record pushes the buffer over that limit, the oldest entries are written
//! to a [`FlushSink`] and removed from memory only once the sink has
//! acknowledged them. The sink therefore holds a gap-free chronological
//! prefix of the session and memory holds the rest.
//!
//! If the sink fails, nothing is evicted: the buffer grows past its limit
//! until a later flush succeeds.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use relay_requestlog::{JsonlFileSink, LogSession, RequestLog, RequestLogger};
//!
//! let session = LogSession::new(Some("github".into()));
//! let sink = JsonlFileSink::for_session("request_logs", session.session_id());
//! let logger = RequestLogger::new(session).with_sink(Arc::new(sink));
//!
//! logger.record(RequestLog::builder("GET", "https://api.github.com/user").build()).await;
//! logger.end_session().await?;
//! ```

mod entry;
mod error;
mod logger;
mod session;
mod sink;

pub use entry::{RequestLog, RequestLogBuilder};
pub use error::{RequestLogError, Result};
pub use logger::{LoggerMetrics, LoggerMetricsSnapshot, RequestLogger, SessionSummary};
pub use session::LogSession;
pub use sink::{FlushSink, JsonlFileSink, MemorySink};
