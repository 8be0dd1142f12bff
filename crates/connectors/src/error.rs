//! Error types for connectors

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while constructing or calling a connector
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Failed to initialize connector (e.g., HTTP client creation failed)
    #[error("failed to initialize connector: {0}")]
    Init(String),

    /// Manifest could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid
    #[error("invalid manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    /// No manifest registered under this name
    #[error("connector '{0}' not found in registry")]
    UnknownConnector(String),

    /// Registered version does not satisfy the pin
    #[error("connector '{name}' version {requested} requested, registry has {available}")]
    VersionMismatch {
        name: String,
        requested: String,
        available: String,
    },

    /// Credential required by the manifest was not supplied
    #[error("missing credential '{0}'")]
    MissingCredential(String),

    /// Request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP transport failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// API rate limited
    #[error("rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Authentication failed
    #[error("authentication failed: HTTP {0}")]
    AuthFailed(u16),

    /// Resource not found
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl ConnectorError {
    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Short category name, safe to report without message details
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init(_) => "Init",
            Self::Io { .. } => "Io",
            Self::Manifest { .. } => "Manifest",
            Self::UnknownConnector(_) => "UnknownConnector",
            Self::VersionMismatch { .. } => "VersionMismatch",
            Self::MissingCredential(_) => "MissingCredential",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::Http(e) if e.is_timeout() => "Timeout",
            Self::Http(_) => "Http",
            Self::Json(_) => "Json",
            Self::RateLimited { .. } => "RateLimited",
            Self::AuthFailed(_) => "AuthFailed",
            Self::NotFound(_) => "NotFound",
            Self::Status { .. } => "Status",
        }
    }

    /// HTTP status behind this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::AuthFailed(status) => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
