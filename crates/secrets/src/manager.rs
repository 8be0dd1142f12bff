//! Credential resolution
//!
//! Turns a connector's mapping of logical credential key -> backend secret
//! name into resolved [`Credentials`]. Resolution is all-or-nothing: if any
//! name is missing the call fails with every missing name listed, so a
//! configuration can be fixed in one pass.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::SecretsBackend;
use crate::error::{Result, SecretsError};

/// Resolves secret mappings against one backend
#[derive(Clone)]
pub struct SecretsManager {
    backend: Arc<dyn SecretsBackend>,
}

impl SecretsManager {
    pub fn new(backend: Arc<dyn SecretsBackend>) -> Self {
        Self { backend }
    }

    /// The backend in use
    pub fn backend(&self) -> &Arc<dyn SecretsBackend> {
        &self.backend
    }

    /// Resolve a single backend name
    pub fn get_secret(&self, name: &str) -> Result<String> {
        self.backend
            .get_secret(name)
            .ok_or_else(|| SecretsError::missing([name]))
    }

    /// Resolve every `(logical_key, backend_name)` pair
    ///
    /// # Errors
    ///
    /// Returns [`SecretsError::Missing`] naming every backend name that did
    /// not resolve. No partial result is returned.
    pub fn get_secrets(&self, mapping: &BTreeMap<String, String>) -> Result<Credentials> {
        let mut resolved = BTreeMap::new();
        let mut missing = Vec::new();

        for (key, backend_name) in mapping {
            match self.backend.get_secret(backend_name) {
                Some(value) => {
                    resolved.insert(key.clone(), value);
                }
                None => missing.push(backend_name.as_str()),
            }
        }

        if !missing.is_empty() {
            let err = SecretsError::missing(missing);
            warn!(
                backend = self.backend.name(),
                missing = ?err.missing_names(),
                "secret resolution failed"
            );
            return Err(err);
        }

        debug!(
            backend = self.backend.name(),
            count = resolved.len(),
            "resolved credentials"
        );
        Ok(Credentials(resolved))
    }
}

/// Resolved credentials keyed by logical credential name
///
/// `Debug` never prints values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self(values)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying map
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, "[REDACTED]")))
            .finish()
    }
}
