//! Secrets backend configuration
//!
//! Secrets are resolved from process environment variables first, then from
//! an optional dotfile of `KEY=value` lines.

use serde::Deserialize;
use std::path::PathBuf;

/// Secrets configuration
///
/// # Example
///
/// ```toml
/// [secrets]
/// dotfile = ".env"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Dotfile consulted when an environment lookup misses
    /// Default: none
    pub dotfile: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_dotfile() {
        assert!(SecretsConfig::default().dotfile.is_none());
    }

    #[test]
    fn test_deserialize_dotfile() {
        let config: SecretsConfig = toml::from_str(r#"dotfile = "/etc/relay/.env""#).unwrap();
        assert_eq!(config.dotfile, Some(PathBuf::from("/etc/relay/.env")));
    }
}
