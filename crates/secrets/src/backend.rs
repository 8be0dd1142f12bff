//! Secret backends
//!
//! A backend resolves one secret name to a value. Backends are chosen at
//! startup and shared behind `Arc<dyn SecretsBackend>`.
//!
//! [`DotEnvSecretsBackend`] checks the process environment first and falls
//! back to a dotfile. A resolved name is cached for the lifetime of the
//! backend: later changes to the environment or the file are not observed,
//! so a session sees one stable set of credentials.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::RwLock;
use tracing::{debug, warn};

/// Lookup of a named secret
pub trait SecretsBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Resolve `name`, `None` when the backend has no value for it
    fn get_secret(&self, name: &str) -> Option<String>;
}

/// Environment variables with a dotfile fallback, cached after first resolution
pub struct DotEnvSecretsBackend {
    /// Optional `KEY=value` file
    dotfile: Option<PathBuf>,

    /// Parsed dotfile, loaded on the first environment miss
    dotfile_values: OnceLock<HashMap<String, String>>,

    /// Resolved values. Concurrent first resolutions may both hit the
    /// sources; the last insert wins.
    cache: RwLock<HashMap<String, String>>,
}

impl DotEnvSecretsBackend {
    /// Backend reading only the process environment
    pub fn new() -> Self {
        Self {
            dotfile: None,
            dotfile_values: OnceLock::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Backend reading the environment, then `path`
    pub fn with_dotfile(path: impl Into<PathBuf>) -> Self {
        Self {
            dotfile: Some(path.into()),
            ..Self::new()
        }
    }

    /// Dotfile path, if configured
    pub fn dotfile(&self) -> Option<&Path> {
        self.dotfile.as_deref()
    }

    /// Number of names resolved so far
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    fn dotfile_values(&self) -> &HashMap<String, String> {
        self.dotfile_values.get_or_init(|| match &self.dotfile {
            Some(path) => load_dotfile(path),
            None => HashMap::new(),
        })
    }

    fn lookup_uncached(&self, name: &str) -> Option<String> {
        if let Ok(value) = std::env::var(name)
            && !value.is_empty()
        {
            return Some(value);
        }

        self.dotfile_values()
            .get(name)
            .filter(|v| !v.is_empty())
            .cloned()
    }
}

impl Default for DotEnvSecretsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretsBackend for DotEnvSecretsBackend {
    fn name(&self) -> &'static str {
        "dotenv"
    }

    fn get_secret(&self, name: &str) -> Option<String> {
        if let Some(value) = self.cache.read().get(name) {
            return Some(value.clone());
        }

        let value = self.lookup_uncached(name)?;
        self.cache.write().insert(name.to_string(), value.clone());
        debug!(secret = %name, "resolved secret");
        Some(value)
    }
}

/// Parse a dotfile; a missing file yields no values
fn load_dotfile(path: &Path) -> HashMap<String, String> {
    let iter = match dotenv::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "dotfile not loaded");
            return HashMap::new();
        }
    };

    let mut values = HashMap::new();
    for item in iter {
        match item {
            Ok((key, value)) => {
                values.insert(key, value);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unparsable dotfile line");
            }
        }
    }
    values
}

/// Fixed in-memory secrets, for embedding and tests
#[derive(Debug, Default, Clone)]
pub struct StaticSecretsBackend {
    values: HashMap<String, String>,
}

impl StaticSecretsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticSecretsBackend {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SecretsBackend for StaticSecretsBackend {
    fn name(&self) -> &'static str {
        "static"
    }

    fn get_secret(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod backend_test;
