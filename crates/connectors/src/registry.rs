//! Local connector registry
//!
//! Named connectors live under `<root>/<name>/manifest.toml`. A version pin
//! must match the manifest's declared version exactly.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConnectorError;
use crate::manifest::{MANIFEST_FILE, Manifest};

#[derive(Debug, Clone)]
pub struct ConnectorRegistry {
    root: PathBuf,
}

impl ConnectorRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Manifest location for `name`, whether or not it exists
    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(MANIFEST_FILE)
    }

    /// Locate and load the manifest for `name`, checking the version pin
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::UnknownConnector`] if no manifest exists
    /// - [`ConnectorError::VersionMismatch`] if `version` is set and differs
    ///   from the manifest's version (or the manifest declares none)
    pub fn resolve(&self, name: &str, version: Option<&str>) -> Result<(PathBuf, Manifest), ConnectorError> {
        if name.contains(['/', '\\']) || name == ".." || name == "." {
            return Err(ConnectorError::UnknownConnector(name.to_string()));
        }

        let path = self.manifest_path(name);
        if !path.is_file() {
            return Err(ConnectorError::UnknownConnector(name.to_string()));
        }

        let manifest = Manifest::load(&path)?;
        if let Some(requested) = version
            && manifest.version.as_deref() != Some(requested)
        {
            return Err(ConnectorError::VersionMismatch {
                name: name.to_string(),
                requested: requested.to_string(),
                available: manifest
                    .version
                    .clone()
                    .unwrap_or_else(|| "unversioned".to_string()),
            });
        }

        debug!(connector = %name, path = %path.display(), "resolved from registry");
        Ok((path, manifest))
    }

    /// Names with a manifest, sorted
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join(MANIFEST_FILE).is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }
}
