//! Serve command - activate connectors and run until interrupted

use std::path::Path;

use anyhow::Result;
use tokio::signal;
use tracing::{info, warn};

use crate::runtime::{ConnectorSession, Runtime};

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let loaded = super::load_config(config_path)?;
    let runtime = Runtime::from_config(loaded.config);

    let activation = runtime.activate_all(loaded.rejected);
    if activation.sessions.is_empty() {
        warn!(
            failed = activation.failures.len(),
            "no connectors active"
        );
    }
    for session in &activation.sessions {
        info!(
            connector = %session.id(),
            name = session.connector().connector_name(),
            session = %session.session_id(),
            "ready"
        );
    }

    info!("relay running, press Ctrl-C to stop");
    wait_for_shutdown().await;
    info!("shutdown signal received, ending sessions...");

    log_totals(&runtime, &activation.sessions);
    runtime.shutdown(activation.sessions).await;

    info!("relay stopped");
    Ok(())
}

fn log_totals(runtime: &Runtime, sessions: &[ConnectorSession]) {
    for session in sessions {
        let summary = session.summary();
        info!(
            connector = %session.id(),
            operations = session.operation_count(),
            errors = session.error_count(),
            logged = summary.total_recorded,
            flushed = summary.flushed,
            "session totals"
        );
    }

    let telemetry = runtime.telemetry();
    if !telemetry.mode().is_disabled() {
        info!(
            events = telemetry.events_built(),
            dispatch_failures = telemetry.dispatch_failures(),
            "telemetry totals"
        );
    }

    let snapshot = runtime.monitor().snapshot();
    let mut metrics: Vec<_> = snapshot.metrics.iter().collect();
    metrics.sort_by(|a, b| a.0.cmp(b.0));

    for (name, stats) in metrics {
        info!(
            operation = %name,
            count = stats.count,
            failures = stats.failures,
            avg_ms = stats.avg_ms(),
            max_ms = stats.max_ms,
            "operation totals"
        );
    }
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
