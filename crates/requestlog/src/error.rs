//! Request log error types

use std::path::PathBuf;

use thiserror::Error;

/// Result type for request log operations
pub type Result<T> = std::result::Result<T, RequestLogError>;

/// Errors that can occur while flushing or exporting request logs
#[derive(Debug, Error)]
pub enum RequestLogError {
    /// Filesystem error in a file-backed sink
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entry could not be serialized
    #[error("failed to serialize request log: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A sink rejected a batch
    #[error("sink '{sink}' rejected batch: {message}")]
    Sink { sink: String, message: String },
}

impl RequestLogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sink {
            sink: sink.into(),
            message: message.into(),
        }
    }
}
