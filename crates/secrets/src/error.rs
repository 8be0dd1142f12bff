//! Secrets error types

use thiserror::Error;

/// Result type for secrets operations
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while resolving secrets
#[derive(Debug, Error)]
pub enum SecretsError {
    /// One or more backend secret names did not resolve
    #[error("unresolved secrets: {}", names.join(", "))]
    Missing {
        /// Every backend name that was absent, sorted and de-duplicated
        names: Vec<String>,
    },
}

impl SecretsError {
    /// Create a Missing error from any collection of names
    pub fn missing(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self::Missing { names }
    }

    /// Names that failed to resolve
    pub fn missing_names(&self) -> &[String] {
        match self {
            Self::Missing { names } => names,
        }
    }
}
