//! Telemetry command - Show what usage telemetry would be sent
//!
//! Displays exactly what telemetry data would be sent, for transparency.
//!
//! # Usage
//!
//! ```bash
//! # Show the events sent when each configured connector is activated
//! relay telemetry show
//!
//! # JSON output
//! relay telemetry show --json
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand};
use relay_config::{Config, ConnectorConfig};
use relay_telemetry::{ConnectorInfo, MemoryTelemetrySink, TelemetryMode, TelemetryTracker};
use serde_json::{Map, Value};

use crate::runtime::install_id;

/// Telemetry command arguments
#[derive(Args, Debug)]
pub struct TelemetryArgs {
    #[command(subcommand)]
    pub command: TelemetryCommand,
}

#[derive(Subcommand, Debug)]
pub enum TelemetryCommand {
    /// Show what telemetry data would be sent
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the telemetry command
pub async fn run(config_path: Option<&Path>, args: TelemetryArgs) -> Result<()> {
    match args.command {
        TelemetryCommand::Show(show_args) => run_show(config_path, show_args),
    }
}

fn run_show(config_path: Option<&Path>, args: ShowArgs) -> Result<()> {
    let config = super::load_config(config_path)?.config;
    let mode = config.telemetry.effective_mode();

    if mode.is_disabled() {
        if args.json {
            println!("[]");
        } else {
            println!("Telemetry is disabled. No events are built or sent.");
        }
        return Ok(());
    }

    // Events go nowhere; the sink only satisfies the tracker
    let tracker = TelemetryTracker::new(mode, install_id(), Arc::new(MemoryTelemetrySink::new()));
    let events = preview_events(&tracker, &config);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        print_preview(mode, &config, &events)?;
    }
    Ok(())
}

/// Init events for every enabled connector, as activation would send them
fn preview_events(tracker: &TelemetryTracker, config: &Config) -> Vec<Map<String, Value>> {
    let session_id = uuid::Uuid::new_v4().to_string();
    config
        .connectors
        .enabled()
        .filter_map(|connector| tracker.connector_init_event(&session_id, preview_info(connector)))
        .map(|event| event.to_map())
        .collect()
}

fn preview_info(connector: &ConnectorConfig) -> ConnectorInfo<'_> {
    ConnectorInfo {
        connector_name: connector.connector_name().unwrap_or(connector.id()),
        connector_version: connector.version(),
        connector_type: connector.connector_type().as_str(),
        credentials_count: connector.secrets().len(),
    }
}

fn print_preview(mode: TelemetryMode, config: &Config, events: &[Map<String, Value>]) -> Result<()> {
    println!("Telemetry mode: {}", mode);
    println!("Endpoint:       {}", config.telemetry.endpoint);
    println!(
        "Sent every:     {}s",
        config.telemetry.flush_interval.as_secs()
    );
    if mode.is_anonymous() {
        println!("User id:        per-session hash, error messages reduced to their kind");
    }
    println!();

    if events.is_empty() {
        println!("No enabled connectors; nothing is sent at activation.");
    } else {
        println!("Sent when each connector is activated:");
        for event in events {
            println!("{}", serde_json::to_string_pretty(event)?);
        }
    }

    println!();
    println!("Also sent:");
    println!("  operation    per call: entity, action, duration, status code, error");
    println!("  session_end  per session: operation count, error count, duration");
    println!();
    println!("Disable with [telemetry] mode = \"disabled\" or DO_NOT_TRACK=1.");
    Ok(())
}
