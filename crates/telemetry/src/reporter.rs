//! Telemetry reporter.
//!
//! Runs in a dedicated task and POSTs batches of events as a JSON array.
//! Callers hand events over with `try_send` on a bounded channel, so they
//! never wait on the network; when the channel is full the event is dropped.

use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::TelemetryError;
use crate::sink::TelemetrySink;

/// Channel capacity between callers and the reporter task
const CHANNEL_BUFFER: usize = 256;

/// Events kept while the endpoint is unreachable
const MAX_PENDING: usize = 1_000;

/// HTTP request timeout
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the telemetry reporter.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Endpoint receiving the JSON array
    pub endpoint: String,

    /// How often pending events are sent
    pub flush_interval: Duration,

    /// Send early once this many events are pending
    pub max_batch: usize,
}

impl ReporterConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            flush_interval: Duration::from_secs(30),
            max_batch: 100,
        }
    }
}

/// Handle for sending events to the reporter.
///
/// Cheap to clone. Sending never blocks.
#[derive(Clone)]
pub struct ReporterHandle {
    tx: mpsc::Sender<ReporterCommand>,
}

impl ReporterHandle {
    /// Request an immediate send of pending events.
    pub fn flush(&self) -> Result<(), TelemetryError> {
        self.command(ReporterCommand::Flush)
    }

    /// Send pending events and stop the task.
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        self.command(ReporterCommand::Shutdown)
    }

    fn command(&self, cmd: ReporterCommand) -> Result<(), TelemetryError> {
        self.tx.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TelemetryError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => TelemetryError::Closed,
        })
    }
}

impl TelemetrySink for ReporterHandle {
    fn send(&self, event: Map<String, Value>) -> Result<(), TelemetryError> {
        self.command(ReporterCommand::Event(event))
    }
}

enum ReporterCommand {
    Event(Map<String, Value>),
    Flush,
    Shutdown,
}

/// Background task owning the pending batch.
pub struct Reporter {
    config: ReporterConfig,
    rx: mpsc::Receiver<ReporterCommand>,
    http_client: reqwest::Client,
    pending: Vec<Map<String, Value>>,
}

impl Reporter {
    /// Create a reporter and its handle; drive it with [`run`](Self::run).
    pub fn new(config: ReporterConfig) -> (Self, ReporterHandle) {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);

        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        let reporter = Self {
            config,
            rx,
            http_client,
            pending: Vec::new(),
        };

        (reporter, ReporterHandle { tx })
    }

    /// Run until shutdown is requested or every handle is dropped.
    pub async fn run(mut self) {
        debug!(
            endpoint = %self.config.endpoint,
            interval_secs = self.config.flush_interval.as_secs(),
            "telemetry reporter started"
        );

        let mut interval = tokio::time::interval(self.config.flush_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.flush_pending().await;
                }
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(ReporterCommand::Event(event)) => {
                            self.pending.push(event);
                            trace!(pending = self.pending.len(), "telemetry event queued");
                            if self.pending.len() >= self.config.max_batch {
                                self.flush_pending().await;
                            }
                        }
                        Some(ReporterCommand::Flush) => {
                            self.flush_pending().await;
                        }
                        Some(ReporterCommand::Shutdown) | None => {
                            debug!("telemetry reporter shutting down");
                            self.flush_pending().await;
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut self.pending);
        match self.send_http(&batch).await {
            Ok(()) => debug!(events = batch.len(), "telemetry sent"),
            Err(e) => {
                warn!(error = %e, events = batch.len(), "failed to send telemetry");
                self.requeue(batch);
            }
        }
    }

    /// Put a failed batch back in front, dropping the oldest beyond MAX_PENDING
    fn requeue(&mut self, mut batch: Vec<Map<String, Value>>) {
        batch.append(&mut self.pending);
        let excess = batch.len().saturating_sub(MAX_PENDING);
        if excess > 0 {
            batch.drain(..excess);
            debug!(dropped = excess, "telemetry backlog full");
        }
        self.pending = batch;
    }

    async fn send_http(&self, batch: &[Map<String, Value>]) -> Result<(), TelemetryError> {
        let body = serde_json::to_vec(batch)?;

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TelemetryError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TelemetryError::Server(response.status().as_u16()))
        }
    }
}

/// Spawn the reporter as a background task.
pub fn spawn(config: ReporterConfig) -> (ReporterHandle, JoinHandle<()>) {
    let (reporter, handle) = Reporter::new(config);
    let task = tokio::spawn(reporter.run());
    (handle, task)
}
