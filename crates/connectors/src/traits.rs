//! Connector trait definition

use std::path::Path;

use async_trait::async_trait;

use crate::error::ConnectorError;
use crate::http::{ApiRequest, ApiResponse};

/// A constructed connector: authenticated calls against one third-party API
///
/// Connectors are built either from a definition file path or from a
/// registered name plus optional version; see
/// [`ConnectorSource`](crate::ConnectorSource).
#[async_trait]
pub trait Connector: Send + Sync {
    /// Logical connector name (e.g., "github", "stripe")
    fn connector_name(&self) -> &str;

    /// Version of the definition in use, if it declares one
    fn connector_version(&self) -> Option<&str>;

    /// Definition file this connector was built from (`None` for hosted)
    fn default_definition_path(&self) -> Option<&Path>;

    /// Send one request through the connector's logged transport
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ConnectorError>;
}
