//! One activated connector
//!
//! Every call goes through the same layers, outermost first:
//! telemetry, instrumentation, then the connector's logged HTTP transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use relay_connectors::{ApiRequest, ApiResponse, Connector, ConnectorError};
use relay_metrics::{Counter, PerformanceMonitor, instrument};
use relay_requestlog::{RequestLogger, SessionSummary};
use relay_telemetry::{OperationFailure, OperationOutcome, SessionStats, TelemetryTracker};
use tokio::time::Instant;
use tracing::{debug, info};

pub struct ConnectorSession {
    id: String,
    session_id: String,
    connector: Arc<dyn Connector>,
    logger: Arc<RequestLogger>,
    monitor: Arc<PerformanceMonitor>,
    telemetry: Arc<TelemetryTracker>,
    started: Instant,
    operations: Counter,
    errors: Counter,
    ended: AtomicBool,
}

impl ConnectorSession {
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        connector: Arc<dyn Connector>,
        logger: Arc<RequestLogger>,
        monitor: Arc<PerformanceMonitor>,
        telemetry: Arc<TelemetryTracker>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            connector,
            logger,
            monitor,
            telemetry,
            started: Instant::now(),
            operations: Counter::new(),
            errors: Counter::new(),
            ended: AtomicBool::new(false),
        }
    }

    /// Connector id from the config
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    pub fn logger(&self) -> &Arc<RequestLogger> {
        &self.logger
    }

    pub fn operation_count(&self) -> u64 {
        self.operations.get()
    }

    pub fn error_count(&self) -> u64 {
        self.errors.get()
    }

    /// Metric name for one operation, `<connector>.<entity>.<action>`
    pub fn metric_name(&self, entity: &str, action: &str) -> String {
        format!("{}.{}.{}", self.connector.connector_name(), entity, action)
    }

    /// Run `request` as the `entity`/`action` operation
    ///
    /// The connector's result is returned unchanged; timing, request logging
    /// and telemetry happen on the side.
    pub async fn call(
        &self,
        entity: &str,
        action: &str,
        request: ApiRequest,
    ) -> Result<ApiResponse, ConnectorError> {
        let metric = self.metric_name(entity, action);
        let start = Instant::now();
        let result = instrument(self.monitor.as_ref(), &metric, self.connector.request(request)).await;
        let duration = start.elapsed();

        self.operations.inc();
        let status_code = match &result {
            Ok(response) => Some(response.status),
            Err(e) => {
                self.errors.inc();
                e.status()
            }
        };

        debug!(
            connector = %self.id,
            operation = %metric,
            duration_ms = duration.as_secs_f64() * 1000.0,
            status = ?status_code,
            success = result.is_ok(),
            "operation completed"
        );

        // Nothing about the outcome is rendered unless an event will be built
        if !self.telemetry.mode().is_disabled() {
            let message = result.as_ref().err().map(ToString::to_string);
            let failure = result
                .as_ref()
                .err()
                .zip(message.as_deref())
                .map(|(e, message)| OperationFailure {
                    kind: e.kind(),
                    message,
                });
            self.telemetry.track_operation(
                &self.session_id,
                OperationOutcome {
                    connector_name: self.connector.connector_name(),
                    entity,
                    action,
                    duration,
                    status_code,
                    failure,
                },
            );
        }

        result
    }

    /// Final flush of the request log, then one session-end event
    ///
    /// Safe to call again after a failed flush; the event is only emitted
    /// once the log has been closed.
    pub async fn end(&self) -> relay_requestlog::Result<usize> {
        let flushed = self.logger.end_session().await?;

        if !self.ended.swap(true, Ordering::AcqRel) {
            let stats = SessionStats {
                operation_count: self.operations.get(),
                error_count: self.errors.get(),
                duration: self.started.elapsed(),
            };
            self.telemetry
                .track_session_end(&self.session_id, self.connector.connector_name(), stats);

            info!(
                connector = %self.id,
                session = %self.session_id,
                operations = stats.operation_count,
                errors = stats.error_count,
                flushed,
                "session ended"
            );
        }

        Ok(flushed)
    }

    pub fn summary(&self) -> SessionSummary {
        self.logger.summary()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
