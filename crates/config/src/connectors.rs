//! Connector configuration types
//!
//! One `[connectors.<id>]` table per connector instance. Each table is
//! deserialized into a [`RawConnectorConfig`] and then validated into a
//! [`ConnectorConfig`]; an invalid combination never becomes a config value.
//!
//! # Example
//!
//! ```toml
//! [connectors.github]
//! type = "local"
//! connector_name = "github"
//! version = "1.2.0"
//! description = "GitHub issues and pull requests"
//!
//! [connectors.github.secrets]
//! token = "GITHUB_TOKEN"
//!
//! [connectors.billing]
//! type = "local"
//! path = "defs/billing.toml"
//!
//! [connectors.crm]
//! type = "hosted"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::{ConfigError, Result};

/// Activation mode of a connector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorType {
    /// Definition resolved on this machine, by path or by registry name
    #[default]
    #[serde(alias = "LOCAL")]
    Local,
    /// Connector runs behind a hosted endpoint
    #[serde(alias = "HOSTED")]
    Hosted,
}

impl ConnectorType {
    /// Lowercase name as written in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Hosted => "hosted",
        }
    }
}

impl std::fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connector table exactly as written in the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConnectorConfig {
    /// Activation mode
    #[serde(rename = "type")]
    pub connector_type: ConnectorType,

    /// Path to a connector definition file
    pub path: Option<PathBuf>,

    /// Registry name (e.g. "github")
    pub connector_name: Option<String>,

    /// Version pin, only meaningful together with `connector_name`
    pub version: Option<String>,

    /// Free text
    pub description: Option<String>,

    /// Logical credential key -> backend secret name
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,

    /// Whether this connector is activated at startup
    /// Default: true
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Where a `local` connector definition is found
///
/// At least one of a definition path and a registry name is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalSource {
    /// Definition file on disk
    Path(PathBuf),
    /// Named manifest in the registry, optionally version-pinned
    Registry {
        name: String,
        version: Option<String>,
    },
    /// Both given; the file is loaded and the name is kept for reporting
    PathAndRegistry {
        path: PathBuf,
        name: String,
        version: Option<String>,
    },
}

impl LocalSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) | Self::PathAndRegistry { path, .. } => Some(path),
            Self::Registry { .. } => None,
        }
    }

    pub fn connector_name(&self) -> Option<&str> {
        match self {
            Self::Registry { name, .. } | Self::PathAndRegistry { name, .. } => Some(name),
            Self::Path(_) => None,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Registry { version, .. } | Self::PathAndRegistry { version, .. } => {
                version.as_deref()
            }
            Self::Path(_) => None,
        }
    }
}

/// Validated description of one connector instance
///
/// Immutable once constructed. A `local` connector always carries a
/// [`LocalSource`]; when both a path and a name are given the path wins at
/// resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    id: String,
    /// `None` for hosted connectors
    local: Option<LocalSource>,
    description: Option<String>,
    secrets: BTreeMap<String, String>,
    enabled: bool,
}

impl ConnectorConfig {
    /// Validate a raw connector table into a config
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingConnectorSource`] for a `local`
    /// connector with neither `path` nor `connector_name`, and
    /// [`ConfigError::InvalidValue`] for an empty id or an empty secret name.
    pub fn new(id: impl Into<String>, raw: RawConnectorConfig) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "connector",
                id,
                "id",
                "must not be empty",
            ));
        }

        for (key, secret_name) in &raw.secrets {
            if key.trim().is_empty() || secret_name.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "connector",
                    id,
                    "secrets",
                    "credential keys and secret names must not be empty",
                ));
            }
        }

        let local = match raw.connector_type {
            ConnectorType::Hosted => None,
            ConnectorType::Local => Some(local_source(
                &id,
                raw.path,
                raw.connector_name,
                raw.version,
            )?),
        };

        Ok(Self {
            id,
            local,
            description: non_empty(raw.description),
            secrets: raw.secrets,
            enabled: raw.enabled,
        })
    }

    /// Local connector loaded from a definition file
    pub fn local_path(id: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(
            id,
            RawConnectorConfig {
                connector_type: ConnectorType::Local,
                path: Some(path.into()),
                enabled: true,
                ..Default::default()
            },
        )
    }

    /// Local connector resolved from the registry
    pub fn local_named(
        id: impl Into<String>,
        connector_name: impl Into<String>,
        version: Option<String>,
    ) -> Result<Self> {
        Self::new(
            id,
            RawConnectorConfig {
                connector_type: ConnectorType::Local,
                connector_name: Some(connector_name.into()),
                version,
                enabled: true,
                ..Default::default()
            },
        )
    }

    /// Hosted connector
    pub fn hosted(id: impl Into<String>) -> Result<Self> {
        Self::new(
            id,
            RawConnectorConfig {
                connector_type: ConnectorType::Hosted,
                enabled: true,
                ..Default::default()
            },
        )
    }

    /// Attach the secret mapping used at activation time
    #[must_use]
    pub fn with_secrets(mut self, secrets: BTreeMap<String, String>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connector_type(&self) -> ConnectorType {
        match self.local {
            Some(_) => ConnectorType::Local,
            None => ConnectorType::Hosted,
        }
    }

    /// Definition source, `None` for hosted connectors
    pub fn local_source(&self) -> Option<&LocalSource> {
        self.local.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.local.as_ref().and_then(LocalSource::path)
    }

    pub fn connector_name(&self) -> Option<&str> {
        self.local.as_ref().and_then(LocalSource::connector_name)
    }

    pub fn version(&self) -> Option<&str> {
        self.local.as_ref().and_then(LocalSource::version)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Logical credential key -> backend secret name
    pub fn secrets(&self) -> &BTreeMap<String, String> {
        &self.secrets
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn local_source(
    id: &str,
    path: Option<PathBuf>,
    connector_name: Option<String>,
    version: Option<String>,
) -> Result<LocalSource> {
    let path = path.filter(|p| !p.as_os_str().is_empty());
    let version = non_empty(version);

    match (path, non_empty(connector_name)) {
        (Some(path), Some(name)) => Ok(LocalSource::PathAndRegistry { path, name, version }),
        (None, Some(name)) => Ok(LocalSource::Registry { name, version }),
        (Some(path), None) => {
            if version.is_some() {
                warn!(connector = %id, "'version' is ignored without 'connector_name'");
            }
            Ok(LocalSource::Path(path))
        }
        (None, None) => Err(ConfigError::missing_connector_source(id)),
    }
}

/// Container for all connector configurations, keyed by connector id
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "BTreeMap<String, RawConnectorConfig>")]
pub struct ConnectorsConfig {
    connectors: BTreeMap<String, ConnectorConfig>,
}

impl TryFrom<BTreeMap<String, RawConnectorConfig>> for ConnectorsConfig {
    type Error = ConfigError;

    fn try_from(raw: BTreeMap<String, RawConnectorConfig>) -> Result<Self> {
        let connectors = raw
            .into_iter()
            .map(|(id, raw)| ConnectorConfig::new(id.clone(), raw).map(|c| (id, c)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { connectors })
    }
}

impl ConnectorsConfig {
    /// Build from already validated configs
    pub fn from_configs(configs: impl IntoIterator<Item = ConnectorConfig>) -> Self {
        Self {
            connectors: configs
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
        }
    }

    /// Get a connector config by id
    pub fn get(&self, id: &str) -> Option<&ConnectorConfig> {
        self.connectors.get(id)
    }

    /// Check if a connector exists
    pub fn contains(&self, id: &str) -> bool {
        self.connectors.contains_key(id)
    }

    /// Iterate over all connectors in id order
    pub fn iter(&self) -> impl Iterator<Item = &ConnectorConfig> {
        self.connectors.values()
    }

    /// Iterate over connectors activated at startup
    pub fn enabled(&self) -> impl Iterator<Item = &ConnectorConfig> {
        self.connectors.values().filter(|c| c.enabled)
    }

    /// Get connectors filtered by activation mode
    pub fn by_type(&self, connector_type: ConnectorType) -> impl Iterator<Item = &ConnectorConfig> {
        self.connectors
            .values()
            .filter(move |c| c.connector_type() == connector_type)
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// Get all connector ids
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.connectors.keys()
    }
}
