//! Relay - Secrets
//!
//! Supplies connector credentials from a pluggable secrets backend.
//!
//! # Design Principles
//!
//! - **Capability trait**: backends implement [`SecretsBackend`] and are
//!   interchangeable behind `Arc<dyn SecretsBackend>`
//! - **Stable view**: [`DotEnvSecretsBackend`] caches every resolved name for
//!   its lifetime; rotation requires a new backend
//! - **Fail fast, fail once**: [`SecretsManager::get_secrets`] reports every
//!   missing name in a single error
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use relay_secrets::{SecretsManager, StaticSecretsBackend};
//!
//! let backend = StaticSecretsBackend::new().with("GITHUB_TOKEN", "ghp_xxx");
//! let manager = SecretsManager::new(Arc::new(backend));
//!
//! let mapping = BTreeMap::from([("token".to_string(), "GITHUB_TOKEN".to_string())]);
//! let creds = manager.get_secrets(&mapping).unwrap();
//! assert_eq!(creds.get("token"), Some("ghp_xxx"));
//! ```

mod backend;
mod error;
mod manager;

pub use backend::{DotEnvSecretsBackend, SecretsBackend, StaticSecretsBackend};
pub use error::{Result, SecretsError};
pub use manager::{Credentials, SecretsManager};
