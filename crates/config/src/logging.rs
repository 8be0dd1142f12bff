//! Logging configuration
//!
//! Base level, per-target overrides and output format for the relay
//! process's own logs. The binary turns this into a `tracing` filter.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Verbosity, most to least
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Where log lines are rendered for humans or for collectors
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    Json,
}

/// `[log]` section
///
/// ```toml
/// [log]
/// level = "info"
/// format = "json"
///
/// [log.targets]
/// relay_requestlog = "debug"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default: info
    pub level: LogLevel,

    /// Default: console
    pub format: LogFormat,

    /// Crate or module path -> level, applied on top of `level`
    pub targets: BTreeMap<String, LogLevel>,
}

impl LogConfig {
    /// `EnvFilter` directive such as `info,relay_requestlog=debug`
    pub fn filter_directive(&self) -> String {
        self.filter_directive_with(self.level)
    }

    /// Directive with `level` replacing the configured base level; target
    /// overrides are kept
    pub fn filter_directive_with(&self, level: LogLevel) -> String {
        self.targets
            .iter()
            .fold(level.as_str().to_string(), |mut directive, (target, level)| {
                directive.push_str(&format!(",{target}={level}"));
                directive
            })
    }

    pub fn is_json(&self) -> bool {
        self.format == LogFormat::Json
    }
}
