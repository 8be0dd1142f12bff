//! Relay - Connectors
//!
//! Construction of connectors from validated configs and the logged HTTP
//! transport every connector call goes through.
//!
//! # Sources
//!
//! - **Path**: a manifest file on disk
//! - **Registry**: `<registry>/<name>/manifest.toml`, optionally version-pinned
//! - **Hosted**: `<hosted_url>/connectors/<id>`
//!
//! # Design Principles
//!
//! - **One contract**: every connector implements [`Connector`] and exposes
//!   its name, version and definition path
//! - **Logged transport**: requests go through [`LoggedHttpClient`], which
//!   records each interaction into the session's request log with
//!   credential headers redacted
//! - **No policy**: retries and rate limiting are left to callers
//!
//! # Example
//!
//! ```ignore
//! use relay_connectors::{ApiRequest, ConnectorFactory, ConnectorRegistry};
//!
//! let factory = ConnectorFactory::new(ConnectorRegistry::new("connectors"), hosted_url);
//! let github = factory.build(&config, &credentials, logger)?;
//! let issues = github.request(ApiRequest::get("/repos/rust-lang/rust/issues")).await?;
//! ```

mod error;
mod factory;
mod http;
mod manifest;
mod registry;
mod source;
mod traits;

#[cfg(test)]
mod test_server;

pub use error::ConnectorError;
pub use factory::ConnectorFactory;
pub use http::{
    ApiRequest, ApiResponse, LoggedHttpClient, MAX_LOGGED_BODY, REDACTED, REDACTED_HEADERS,
    redact_headers,
};
pub use manifest::{AuthSpec, HOSTED_API_KEY, MANIFEST_FILE, Manifest, ManifestConnector};
pub use registry::ConnectorRegistry;
pub use source::ConnectorSource;
pub use traits::Connector;
