//! Telemetry error types.
//!
//! None of these reach connector callers: the tracker logs and counts them.

use thiserror::Error;

/// Errors that can occur while dispatching telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Reporter channel is full (non-blocking send failed)
    #[error("telemetry channel full, event dropped")]
    ChannelFull,

    /// Reporter task is gone
    #[error("telemetry reporter stopped")]
    Closed,

    /// Network error during submission
    #[error("network error: {0}")]
    Network(String),

    /// Endpoint returned an error status
    #[error("server error: HTTP {0}")]
    Server(u16),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (e.g., reading/writing install ID)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
