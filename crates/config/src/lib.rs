//! Relay Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use relay_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[connectors.crm]\ntype = \"hosted\"").unwrap();
//! assert!(config.connectors.contains("crm"));
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [telemetry]
//! mode = "anonymous"
//!
//! [secrets]
//! dotfile = ".env"
//!
//! [request_log]
//! max_logs = 10000
//! directory = "request_logs"
//!
//! [connectors.github]
//! type = "local"
//! connector_name = "github"
//!
//! [connectors.github.secrets]
//! token = "GITHUB_TOKEN"
//! ```

mod connectors;
mod error;
mod logging;
mod registry;
mod request_log;
mod secrets;
mod telemetry;
mod validation;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use connectors::{
    ConnectorConfig, ConnectorType, ConnectorsConfig, LocalSource, RawConnectorConfig,
};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use registry::{DEFAULT_HOSTED_URL, RegistryConfig};
pub use request_log::{DEFAULT_MAX_LOGS, RequestLogConfig};
pub use secrets::SecretsConfig;
pub use telemetry::{
    DEFAULT_TELEMETRY_ENDPOINT, DO_NOT_TRACK_ENV_VAR, TELEMETRY_MODE_ENV_VAR, TelemetryConfig,
    TelemetryMode,
};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Usage telemetry
    pub telemetry: TelemetryConfig,

    /// Secrets backend
    pub secrets: SecretsConfig,

    /// Per-session request/response log
    pub request_log: RequestLogConfig,

    /// Where named and hosted connectors are found
    pub registry: RegistryConfig,

    /// Connector instances keyed by id
    pub connectors: ConnectorsConfig,
}

/// Configuration loaded leniently, with the connector tables that failed
/// validation set aside instead of failing the whole file
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// Connector id and the reason it was rejected, in id order
    pub rejected: Vec<(String, ConfigError)>,
}

/// Same sections as [`Config`], connectors not yet validated
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    log: LogConfig,
    telemetry: TelemetryConfig,
    secrets: SecretsConfig,
    request_log: RequestLogConfig,
    registry: RegistryConfig,
    connectors: BTreeMap<String, RawConnectorConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_str(&read_file(path.as_ref())?)
    }

    /// Load a TOML file, rejecting invalid connectors individually
    ///
    /// Syntax errors and invalid non-connector sections still fail the load.
    pub fn load_lenient<P: AsRef<Path>>(path: P) -> Result<LoadedConfig> {
        Self::parse_lenient(&read_file(path.as_ref())?)
    }

    /// Parse a TOML string, rejecting invalid connectors individually
    pub fn parse_lenient(s: &str) -> Result<LoadedConfig> {
        let raw: RawConfig = toml::from_str(s).map_err(ConfigError::Parse)?;

        let mut valid = Vec::with_capacity(raw.connectors.len());
        let mut rejected = Vec::new();
        for (id, table) in raw.connectors {
            match ConnectorConfig::new(id.clone(), table) {
                Ok(connector) => valid.push(connector),
                Err(e) => {
                    tracing::warn!(connector = %id, error = %e, "connector config rejected");
                    rejected.push((id, e));
                }
            }
        }

        let config = Config {
            log: raw.log,
            telemetry: raw.telemetry,
            secrets: raw.secrets,
            request_log: raw.request_log,
            registry: raw.registry,
            connectors: ConnectorsConfig::from_configs(valid),
        };
        config.validate()?;
        Ok(LoadedConfig { config, rejected })
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
