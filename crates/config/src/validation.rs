//! Configuration validation
//!
//! Connector tables are validated while deserializing. This pass checks the
//! remaining cross-section constraints:
//! - Bounded request logs keep at least one entry
//! - Telemetry endpoint is an http(s) URL unless telemetry is disabled
//! - Hosted connectors have an http(s) hosted URL to reach

use crate::Config;
use crate::connectors::ConnectorType;
use crate::error::{ConfigError, Result};
use crate::telemetry::TelemetryMode;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_request_log(config)?;
    validate_telemetry(config)?;
    validate_registry(config)?;
    Ok(())
}

fn validate_request_log(config: &Config) -> Result<()> {
    if !config.request_log.unbounded && config.request_log.max_logs == 0 {
        return Err(ConfigError::invalid_value(
            "request_log",
            "request_log",
            "max_logs",
            "must be greater than zero (set 'unbounded = true' to disable eviction)",
        ));
    }

    if config.request_log.unbounded {
        tracing::warn!(
            "request log is unbounded; memory grows with session length"
        );
    }

    Ok(())
}

fn validate_telemetry(config: &Config) -> Result<()> {
    let telemetry = &config.telemetry;
    if telemetry.mode == TelemetryMode::Disabled {
        return Ok(());
    }

    if !is_http_url(&telemetry.endpoint) {
        return Err(ConfigError::invalid_value(
            "telemetry",
            "telemetry",
            "endpoint",
            format!("'{}' is not an http(s) URL", telemetry.endpoint),
        ));
    }

    if telemetry.flush_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "telemetry",
            "telemetry",
            "flush_interval",
            "must be greater than zero",
        ));
    }

    Ok(())
}

fn validate_registry(config: &Config) -> Result<()> {
    let has_hosted = config
        .connectors
        .by_type(ConnectorType::Hosted)
        .any(|c| c.is_enabled());

    if has_hosted && !is_http_url(&config.registry.hosted_url) {
        return Err(ConfigError::invalid_value(
            "registry",
            "registry",
            "hosted_url",
            format!("'{}' is not an http(s) URL", config.registry.hosted_url),
        ));
    }

    Ok(())
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    rest.is_some_and(|host| !host.is_empty())
}
