//! Command implementations for the relay CLI

pub mod call;
pub mod check;
pub mod serve;
pub mod telemetry;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use relay_config::{Config, LoadedConfig};

/// Searched in order when no `--config` is given
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["relay.toml", "configs/relay.toml"];

/// Explicit path (must exist), else the first default path that exists
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("config file not found: {}", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    Ok(DEFAULT_CONFIG_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists()))
}

/// Load config, setting invalid connector tables aside
///
/// Without a path the defaults apply and no connectors are configured.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    match path {
        Some(p) => Config::load_lenient(p)
            .with_context(|| format!("failed to load config from {}", p.display())),
        None => Ok(LoadedConfig {
            config: Config::default(),
            rejected: Vec::new(),
        }),
    }
}
