//! Relay telemetry - transparent, non-blocking usage events.
//!
//! Key principles:
//!
//! - **Best effort**: dispatch failures are logged and counted, never returned
//! - **Zero cost when off**: in [`TelemetryMode::Disabled`] no event is built
//! - **Transparent**: `relay telemetry show` prints exactly what would be sent
//! - **Privacy-respecting**: the user id is an install hash, or a per-session
//!   hash in [`TelemetryMode::Anonymous`]
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌────────────────┐     ┌──────────────┐
//! │ TelemetryTracker │────▶│ TelemetryEvent │────▶│   Reporter   │
//! │ (lifecycle hooks)│     │  (flat map)    │     │ (async task) │
//! └──────────────────┘     └────────────────┘     └──────────────┘
//!                                                        │
//!                                                        ▼
//!                                                 HTTP POST (JSON)
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! # async fn example() {
//! use std::sync::Arc;
//! use relay_telemetry::{ReporterConfig, TelemetryMode, TelemetryTracker, reporter};
//!
//! let install_id = relay_telemetry::load_or_create_install_id(
//!     &relay_telemetry::default_install_id_path(),
//! )
//! .unwrap_or_else(|_| relay_telemetry::generate_install_id());
//!
//! let (handle, _task) = reporter::spawn(ReporterConfig::new(
//!     "https://telemetry.relay.dev/v1/events",
//! ));
//! let tracker = TelemetryTracker::new(TelemetryMode::Enabled, install_id, Arc::new(handle));
//! # }
//! ```

pub mod error;
pub mod event;
mod install;
pub mod reporter;
mod sink;
mod tracker;

pub use error::TelemetryError;
pub use event::{
    ConnectorInitEvent, EventHeader, ExecutionContext, OperationEvent, SessionEndEvent,
    TelemetryEvent,
};
pub use install::{
    INSTALL_ID_LEN, default_install_id_path, generate_install_id, load_or_create_install_id,
    session_scoped_user_id,
};
pub use relay_config::TelemetryMode;
pub use reporter::{ReporterConfig, ReporterHandle};
pub use sink::{MemoryTelemetrySink, TelemetrySink};
pub use tracker::{ConnectorInfo, OperationFailure, OperationOutcome, SessionStats, TelemetryTracker};
