//! Connector registry configuration
//!
//! Local connectors configured by `connector_name` are looked up under
//! `<path>/<connector_name>/manifest.toml`. Hosted connectors are reached
//! under `<hosted_url>/connectors/<id>`.

use serde::Deserialize;
use std::path::PathBuf;

/// Default hosted connector endpoint
pub const DEFAULT_HOSTED_URL: &str = "https://hosted.relay.dev";

/// Registry configuration
///
/// # Example
///
/// ```toml
/// [registry]
/// path = "/opt/relay/connectors"
/// hosted_url = "https://hosted.example.com"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Root directory of named connector manifests
    /// Default: "connectors"
    pub path: PathBuf,

    /// Base URL for hosted connectors
    pub hosted_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("connectors"),
            hosted_url: DEFAULT_HOSTED_URL.to_string(),
        }
    }
}
