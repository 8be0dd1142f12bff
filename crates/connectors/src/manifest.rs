//! Manifest-defined REST connectors
//!
//! A manifest is a small TOML file describing a REST API:
//!
//! ```toml
//! name = "github"
//! version = "1.2.0"
//! base_url = "https://api.github.com"
//!
//! [auth]
//! credential = "token"        # key in the resolved credentials
//! header = "Authorization"    # default
//! scheme = "Bearer"           # default; "" sends the raw value
//!
//! [headers]
//! Accept = "application/vnd.github+json"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use relay_requestlog::RequestLogger;
use relay_secrets::Credentials;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConnectorError;
use crate::http::{ApiRequest, ApiResponse, LoggedHttpClient};
use crate::traits::Connector;

/// File name of a manifest inside a registry entry
pub const MANIFEST_FILE: &str = "manifest.toml";

/// Credential key hosted connectors authenticate with
pub const HOSTED_API_KEY: &str = "api_key";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub base_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub auth: Option<AuthSpec>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// How a credential is attached to requests
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSpec {
    pub credential: String,
    #[serde(default = "default_auth_header")]
    pub header: String,
    #[serde(default = "default_auth_scheme")]
    pub scheme: String,
}

fn default_auth_header() -> String {
    "Authorization".to_string()
}

fn default_auth_scheme() -> String {
    "Bearer".to_string()
}

impl AuthSpec {
    pub fn bearer(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            header: default_auth_header(),
            scheme: default_auth_scheme(),
        }
    }

    fn header_value(&self, secret: &str) -> String {
        if self.scheme.is_empty() {
            secret.to_string()
        } else {
            format!("{} {}", self.scheme, secret)
        }
    }
}

impl Manifest {
    /// Read and validate a manifest file
    pub fn load(path: &Path) -> Result<Self, ConnectorError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConnectorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse manifest text; `path` is only used in errors
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConnectorError> {
        let manifest: Self =
            toml::from_str(content).map_err(|e| ConnectorError::manifest(path, e.to_string()))?;

        if manifest.name.trim().is_empty() {
            return Err(ConnectorError::manifest(path, "name must not be empty"));
        }
        if !(manifest.base_url.starts_with("http://") || manifest.base_url.starts_with("https://")) {
            return Err(ConnectorError::manifest(
                path,
                format!("base_url must be http(s), got '{}'", manifest.base_url),
            ));
        }
        Ok(manifest)
    }
}

/// Generic REST connector built from a [`Manifest`]
pub struct ManifestConnector {
    manifest: Manifest,
    definition_path: Option<PathBuf>,
    http: LoggedHttpClient,
}

impl ManifestConnector {
    /// Build from a parsed manifest
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::MissingCredential`] when the manifest's auth
    /// block names a credential that was not resolved.
    pub fn new(
        manifest: Manifest,
        definition_path: Option<PathBuf>,
        credentials: &Credentials,
        logger: Arc<RequestLogger>,
    ) -> Result<Self, ConnectorError> {
        let mut http = LoggedHttpClient::new(manifest.base_url.clone(), logger)?;
        for (name, value) in &manifest.headers {
            http = http.with_default_header(name.clone(), value.clone());
        }
        if let Some(auth) = &manifest.auth {
            let secret = credentials
                .get(&auth.credential)
                .ok_or_else(|| ConnectorError::MissingCredential(auth.credential.clone()))?;
            http = http.with_default_header(auth.header.clone(), auth.header_value(secret));
        }

        debug!(
            connector = %manifest.name,
            version = manifest.version.as_deref().unwrap_or("-"),
            base_url = %manifest.base_url,
            "manifest connector constructed"
        );

        Ok(Self {
            manifest,
            definition_path,
            http,
        })
    }

    /// Build from a manifest file
    pub fn from_path(
        path: &Path,
        credentials: &Credentials,
        logger: Arc<RequestLogger>,
    ) -> Result<Self, ConnectorError> {
        let manifest = Manifest::load(path)?;
        Self::new(manifest, Some(path.to_path_buf()), credentials, logger)
    }

    /// Connector served at `<hosted_url>/connectors/<id>`
    ///
    /// Uses the `api_key` credential as a bearer token when present.
    pub fn hosted(
        id: &str,
        hosted_url: &str,
        credentials: &Credentials,
        logger: Arc<RequestLogger>,
    ) -> Result<Self, ConnectorError> {
        let manifest = Manifest {
            name: id.to_string(),
            version: None,
            base_url: format!("{}/connectors/{}", hosted_url.trim_end_matches('/'), id),
            description: None,
            auth: credentials
                .contains(HOSTED_API_KEY)
                .then(|| AuthSpec::bearer(HOSTED_API_KEY)),
            headers: BTreeMap::new(),
        };
        Self::new(manifest, None, credentials, logger)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }
}

#[async_trait]
impl Connector for ManifestConnector {
    fn connector_name(&self) -> &str {
        &self.manifest.name
    }

    fn connector_version(&self) -> Option<&str> {
        self.manifest.version.as_deref()
    }

    fn default_definition_path(&self) -> Option<&Path> {
        self.definition_path.as_deref()
    }

    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ConnectorError> {
        self.http.send(request).await
    }
}
