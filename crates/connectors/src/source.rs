//! Where a connector definition comes from

use std::fmt;
use std::path::PathBuf;

use relay_config::{ConnectorConfig, LocalSource};

/// Resolved activation source for one connector config
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorSource {
    /// Definition file on disk
    Path(PathBuf),
    /// Named manifest in the local registry, optionally version-pinned
    Registry {
        name: String,
        version: Option<String>,
    },
    /// Served by the hosted endpoint under the connector id
    Hosted { id: String },
}

impl ConnectorSource {
    /// Source for a validated config; `path` wins when both are set
    pub fn from_config(config: &ConnectorConfig) -> Self {
        match config.local_source() {
            None => Self::Hosted {
                id: config.id().to_string(),
            },
            Some(LocalSource::Path(path) | LocalSource::PathAndRegistry { path, .. }) => {
                Self::Path(path.clone())
            }
            Some(LocalSource::Registry { name, version }) => Self::Registry {
                name: name.clone(),
                version: version.clone(),
            },
        }
    }
}

impl fmt::Display for ConnectorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "path:{}", path.display()),
            Self::Registry {
                name,
                version: Some(version),
            } => write!(f, "registry:{name}@{version}"),
            Self::Registry {
                name,
                version: None,
            } => write!(f, "registry:{name}"),
            Self::Hosted { id } => write!(f, "hosted:{id}"),
        }
    }
}
