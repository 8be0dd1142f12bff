//! Configuration errors

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Malformed TOML, unknown keys, or a connector table rejected while
    /// deserializing strictly
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A local connector names neither a definition path nor a registry name
    #[error("connector '{id}' has type 'local' but sets neither 'path' nor 'connector_name'")]
    MissingConnectorSource { id: String },

    /// A field is present but unusable
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Section kind, e.g. "connector" or "telemetry"
        component: &'static str,
        name: String,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub fn missing_connector_source(id: impl Into<String>) -> Self {
        Self::MissingConnectorSource { id: id.into() }
    }

    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}
