//! Telemetry sinks.

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::error::TelemetryError;

/// Destination for serialized events.
///
/// `send` must return promptly; delivery is fire-and-forget.
pub trait TelemetrySink: Send + Sync {
    fn send(&self, event: Map<String, Value>) -> Result<(), TelemetryError>;
}

/// Collects events in memory (tests, `relay telemetry show`).
#[derive(Default)]
pub struct MemoryTelemetrySink {
    events: Mutex<Vec<Map<String, Value>>>,
}

impl MemoryTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Map<String, Value>> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl TelemetrySink for MemoryTelemetrySink {
    fn send(&self, event: Map<String, Value>) -> Result<(), TelemetryError> {
        self.events.lock().push(event);
        Ok(())
    }
}
