//! Check command - validate connector configs and resolve their secrets
//!
//! Nothing is activated: no request log sessions are opened, no upstream
//! calls are made and no telemetry is sent.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;
use relay_connectors::ConnectorSource;
use relay_telemetry::TelemetryTracker;

use crate::runtime::{ActivationError, Runtime, secrets_backend};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Only check these connector ids (default: all, including disabled)
    pub connectors: Vec<String>,
}

/// One row of the report
#[derive(Debug, PartialEq)]
struct CheckRow {
    id: String,
    status: &'static str,
    detail: String,
}

pub async fn run(config_path: Option<&Path>, args: CheckArgs) -> Result<()> {
    let loaded = super::load_config(config_path)?;
    if let Some(unknown) = args.connectors.iter().find(|id| {
        !loaded.config.connectors.contains(id) && !loaded.rejected.iter().any(|(r, _)| r == *id)
    }) {
        bail!("no connector '{}' in config", unknown);
    }

    let backend = secrets_backend(&loaded.config);
    let runtime = Runtime::new(loaded.config, backend, Arc::new(TelemetryTracker::disabled()));

    let mut failures: Vec<ActivationError> = loaded
        .rejected
        .into_iter()
        .filter(|(id, _)| selected(&args.connectors, id))
        .map(|(id, source)| ActivationError::Configuration { id, source })
        .collect();
    let mut rows: Vec<CheckRow> = Vec::new();

    for connector in runtime.config().connectors.iter() {
        if !selected(&args.connectors, connector.id()) {
            continue;
        }
        match runtime.check(connector) {
            Ok(()) => rows.push(CheckRow {
                id: connector.id().to_string(),
                status: if connector.is_enabled() { "ok" } else { "disabled" },
                detail: ConnectorSource::from_config(connector).to_string(),
            }),
            Err(e) => failures.push(e),
        }
    }

    rows.extend(failures.iter().map(|e| CheckRow {
        id: e.connector_id().to_string(),
        status: "error",
        detail: failure_detail(e),
    }));
    rows.sort_by(|a, b| a.id.cmp(&b.id));

    print_report(&rows);

    if !failures.is_empty() {
        bail!("{} of {} connector(s) failed checks", failures.len(), rows.len());
    }
    Ok(())
}

fn selected(filter: &[String], id: &str) -> bool {
    filter.is_empty() || filter.iter().any(|f| f == id)
}

fn failure_detail(error: &ActivationError) -> String {
    match error {
        ActivationError::Configuration { source, .. } => format!("configuration: {source}"),
        ActivationError::Secrets { source, .. } => format!("secrets: {source}"),
        ActivationError::Construction { source, .. } => format!("construction: {source}"),
    }
}

fn print_report(rows: &[CheckRow]) {
    if rows.is_empty() {
        println!("No connectors configured.");
        return;
    }

    let width = rows.iter().map(|r| r.id.len()).max().unwrap_or(0).max("CONNECTOR".len());
    println!("{:<width$}  {:<8}  DETAIL", "CONNECTOR", "STATUS");
    for row in rows {
        println!("{:<width$}  {:<8}  {}", row.id, row.status, row.detail);
    }
}
