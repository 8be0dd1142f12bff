//! Relay - connector runtime
//!
//! # Usage
//!
//! ```bash
//! # Activate every enabled connector and run until Ctrl-C (default)
//! relay
//! relay --config relay.toml
//!
//! # Validate connector configs and secrets without activating anything
//! relay check
//!
//! # One instrumented request through a configured connector
//! relay call github GET /repos/rust-lang/rust/issues --query state=open
//!
//! # Show exactly what telemetry would be sent
//! relay telemetry show
//! ```

mod cmd;
mod runtime;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use relay_config::{Config, LogLevel};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Relay - connector runtime
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Activate connectors and run until interrupted
    Serve,

    /// Validate connector configs and resolve their secrets
    Check(cmd::check::CheckArgs),

    /// Send one request through a configured connector
    Call(cmd::call::CallArgs),

    /// Show and manage usage telemetry
    Telemetry(cmd::telemetry::TelemetryArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cmd::resolve_config_path(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Check(args)) => {
            // Check reports to stdout; only warnings go to the log
            init_logging(&LogSettings::resolve(Some("warn"), config_path.as_deref()))?;
            cmd::check::run(config_path.as_deref(), args).await
        }
        Some(Command::Call(args)) => {
            let settings = LogSettings::resolve(cli.log_level.as_deref(), config_path.as_deref());
            init_logging(&settings)?;
            cmd::call::run(config_path.as_deref(), args).await
        }
        Some(Command::Telemetry(args)) => {
            // Telemetry show doesn't need logging - just outputs to stdout
            cmd::telemetry::run(config_path.as_deref(), args).await
        }
        Some(Command::Serve) | None => {
            let settings = LogSettings::resolve(cli.log_level.as_deref(), config_path.as_deref());
            init_logging(&settings)?;
            cmd::serve::run(config_path.as_deref()).await
        }
    }
}

/// Filter directive and output format for the subscriber
struct LogSettings {
    directive: String,
    json: bool,
}

impl LogSettings {
    /// Resolve log level: CLI flag > config file > default "info"
    fn resolve(cli_level: Option<&str>, config_path: Option<&Path>) -> Self {
        let config = config_path
            .filter(|path| path.exists())
            .and_then(|path| Config::load_lenient(path).ok());

        let log = config.map(|loaded| loaded.config.log).unwrap_or_default();
        let directive = match cli_level {
            // A plain level keeps the configured per-target overrides
            Some(level) => match level.parse::<LogLevel>() {
                Ok(level) => log.filter_directive_with(level),
                Err(_) => level.to_string(),
            },
            None => log.filter_directive(),
        };

        Self {
            directive,
            json: log.is_json(),
        }
    }
}

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_logging(settings: &LogSettings) -> Result<()> {
    let filter = EnvFilter::try_new(&settings.directive)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    if settings.json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}
