//! Performance monitor
//!
//! Receives one [`MetricSample`] per instrumented call and keeps per-metric
//! aggregates plus a bounded window of recent samples.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{trace, warn};

/// Recent samples kept for inspection
pub const DEFAULT_RECENT_CAPACITY: usize = 256;

/// Outcome of one instrumented operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    /// Metric name, e.g. "github.list_issues"
    pub name: String,
    /// Wall-clock duration in milliseconds
    pub duration_ms: f64,
    /// Whether the operation returned `Ok`
    pub success: bool,
    /// When the operation completed
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    pub fn new(name: impl Into<String>, duration: Duration, success: bool) -> Self {
        Self {
            name: name.into(),
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
            timestamp: Utc::now(),
        }
    }
}

/// Destination for metric samples
///
/// `record` is called after the operation finished and must not block for long.
pub trait MonitorSink: Send + Sync {
    fn record(&self, sample: MetricSample);
}

/// Aggregates for one metric name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricStats {
    pub count: u64,
    pub failures: u64,
    pub total_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl MetricStats {
    fn add(&mut self, sample: &MetricSample) {
        if self.count == 0 {
            self.min_ms = sample.duration_ms;
            self.max_ms = sample.duration_ms;
        } else {
            self.min_ms = self.min_ms.min(sample.duration_ms);
            self.max_ms = self.max_ms.max(sample.duration_ms);
        }
        self.count += 1;
        self.total_ms += sample.duration_ms;
        if !sample.success {
            self.failures += 1;
        }
    }

    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }

    /// Fraction of successful samples, 1.0 when empty
    pub fn success_rate(&self) -> f64 {
        if self.count == 0 {
            1.0
        } else {
            (self.count - self.failures) as f64 / self.count as f64
        }
    }
}

/// Point-in-time copy of all aggregates
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorSnapshot {
    pub metrics: HashMap<String, MetricStats>,
    pub samples_total: u64,
}

/// In-process monitor shared by every session
pub struct PerformanceMonitor {
    stats: Mutex<HashMap<String, MetricStats>>,
    recent: Mutex<VecDeque<MetricSample>>,
    recent_capacity: usize,
    /// Samples slower than this are logged as warnings
    slow_threshold: Option<Duration>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RECENT_CAPACITY)
    }

    /// Monitor keeping `recent_capacity` recent samples
    pub fn with_capacity(recent_capacity: usize) -> Self {
        Self {
            stats: Mutex::new(HashMap::new()),
            recent: Mutex::new(VecDeque::with_capacity(recent_capacity)),
            recent_capacity,
            slow_threshold: None,
        }
    }

    /// Warn about operations slower than `threshold`
    #[must_use]
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    /// Aggregates for one metric
    pub fn stats(&self, name: &str) -> Option<MetricStats> {
        self.stats.lock().get(name).cloned()
    }

    /// Most recent samples, oldest first
    pub fn recent_samples(&self) -> Vec<MetricSample> {
        self.recent.lock().iter().cloned().collect()
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let metrics = self.stats.lock().clone();
        let samples_total = metrics.values().map(|s| s.count).sum();
        MonitorSnapshot {
            metrics,
            samples_total,
        }
    }

    /// Drop all aggregates and samples
    pub fn reset(&self) {
        self.stats.lock().clear();
        self.recent.lock().clear();
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorSink for PerformanceMonitor {
    fn record(&self, sample: MetricSample) {
        if let Some(threshold) = self.slow_threshold
            && sample.duration_ms > threshold.as_secs_f64() * 1000.0
        {
            warn!(
                metric = %sample.name,
                duration_ms = sample.duration_ms,
                threshold_ms = threshold.as_millis() as u64,
                success = sample.success,
                "slow operation"
            );
        } else {
            trace!(
                metric = %sample.name,
                duration_ms = sample.duration_ms,
                success = sample.success,
                "metric sample"
            );
        }

        self.stats
            .lock()
            .entry(sample.name.clone())
            .or_default()
            .add(&sample);

        if self.recent_capacity > 0 {
            let mut recent = self.recent.lock();
            if recent.len() == self.recent_capacity {
                recent.pop_front();
            }
            recent.push_back(sample);
        }
    }
}
