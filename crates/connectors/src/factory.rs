//! Connector construction from validated configs

use std::sync::Arc;

use relay_config::ConnectorConfig;
use relay_requestlog::RequestLogger;
use relay_secrets::Credentials;
use tracing::info;

use crate::error::ConnectorError;
use crate::manifest::ManifestConnector;
use crate::registry::ConnectorRegistry;
use crate::source::ConnectorSource;
use crate::traits::Connector;

/// Builds connectors for any [`ConnectorSource`]
#[derive(Debug, Clone)]
pub struct ConnectorFactory {
    registry: ConnectorRegistry,
    hosted_url: String,
}

impl ConnectorFactory {
    pub fn new(registry: ConnectorRegistry, hosted_url: impl Into<String>) -> Self {
        Self {
            registry,
            hosted_url: hosted_url.into(),
        }
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    /// Construct the connector `config` describes, logging through `logger`
    pub fn build(
        &self,
        config: &ConnectorConfig,
        credentials: &Credentials,
        logger: Arc<RequestLogger>,
    ) -> Result<Arc<dyn Connector>, ConnectorError> {
        let source = ConnectorSource::from_config(config);
        let connector = match &source {
            ConnectorSource::Path(path) => ManifestConnector::from_path(path, credentials, logger)?,
            ConnectorSource::Registry { name, version } => {
                let (path, manifest) = self.registry.resolve(name, version.as_deref())?;
                ManifestConnector::new(manifest, Some(path), credentials, logger)?
            }
            ConnectorSource::Hosted { id } => {
                ManifestConnector::hosted(id, &self.hosted_url, credentials, logger)?
            }
        };

        info!(
            connector = %config.id(),
            %source,
            name = connector.connector_name(),
            version = connector.connector_version().unwrap_or("-"),
            "connector constructed"
        );
        Ok(Arc::new(connector))
    }
}
