//! Telemetry configuration
//!
//! Controls usage telemetry for connector sessions.
//!
//! # Defaults
//!
//! - `mode`: enabled
//! - `flush_interval`: 30 seconds
//!
//! The mode is resolved once at startup. `RELAY_TELEMETRY_MODE` overrides the
//! file setting and `DO_NOT_TRACK=1` forces telemetry off.
//!
//! # What's Collected
//!
//! - Connector activation: connector name/version, activation mode, runtime info
//! - Operations: entity, action, duration, success, error kind
//! - Session end: operation counts, request counts, session duration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Environment variable overriding the configured mode
pub const TELEMETRY_MODE_ENV_VAR: &str = "RELAY_TELEMETRY_MODE";

/// Conventional opt-out variable honored by many CLIs
pub const DO_NOT_TRACK_ENV_VAR: &str = "DO_NOT_TRACK";

/// Default collection endpoint
pub const DEFAULT_TELEMETRY_ENDPOINT: &str = "https://telemetry.relay.dev/v1/events";

/// How telemetry events are built and sent, resolved once at startup
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryMode {
    /// Events are built and sent with the install id as user id
    #[default]
    Enabled,
    /// Events carry a per-session user id and error kinds instead of messages
    Anonymous,
    /// No event is constructed
    Disabled,
}

impl TelemetryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Anonymous => "anonymous",
            Self::Disabled => "disabled",
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl fmt::Display for TelemetryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TelemetryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" | "on" | "true" | "1" => Ok(Self::Enabled),
            "anonymous" | "anon" => Ok(Self::Anonymous),
            "disabled" | "off" | "false" | "0" => Ok(Self::Disabled),
            other => Err(format!("unknown telemetry mode '{other}'")),
        }
    }
}

/// Telemetry configuration
///
/// # Example
///
/// ```toml
/// [telemetry]
/// mode = "anonymous"
/// endpoint = "https://telemetry.example.com/v1/events"
/// flush_interval = "1m"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Telemetry mode
    /// Default: enabled
    pub mode: TelemetryMode,

    /// Collection endpoint (HTTP POST, JSON array of events)
    pub endpoint: String,

    /// How often queued events are sent
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            mode: TelemetryMode::Enabled,
            endpoint: DEFAULT_TELEMETRY_ENDPOINT.to_string(),
            flush_interval: Duration::from_secs(30),
        }
    }
}

impl TelemetryConfig {
    /// Mode after applying environment overrides
    pub fn effective_mode(&self) -> TelemetryMode {
        self.resolve_mode(|name| std::env::var(name).ok())
    }

    /// Mode after applying overrides read through `lookup`
    pub fn resolve_mode(&self, lookup: impl Fn(&str) -> Option<String>) -> TelemetryMode {
        if lookup(DO_NOT_TRACK_ENV_VAR).is_some_and(|v| matches!(v.trim(), "1" | "true")) {
            return TelemetryMode::Disabled;
        }

        match lookup(TELEMETRY_MODE_ENV_VAR) {
            Some(value) => match value.parse() {
                Ok(mode) => mode,
                Err(_) => {
                    tracing::warn!(
                        value = %value,
                        env = TELEMETRY_MODE_ENV_VAR,
                        "unrecognized telemetry mode, using config value"
                    );
                    self.mode
                }
            },
            None => self.mode,
        }
    }
}
