//! Relay - Metrics
//!
//! Performance monitoring for connector calls and the small observability
//! helpers shared by the other relay crates.
//!
//! # Overview
//!
//! This crate provides:
//! - [`instrument`] / [`Instrumented`]: time an async operation and emit one
//!   [`MetricSample`] without changing its result
//! - [`MonitorSink`]: where samples go; [`PerformanceMonitor`] aggregates them
//!   per metric name
//! - [`Counter`]: atomic counter used for component metrics
//! - [`RateLimitedLogger`]: error logging that stays quiet under error storms
//!
//! # Observe, Don't Intercept
//!
//! The wrapper returns exactly what the wrapped operation returns, error
//! included. Removing instrumentation never changes a connector's behavior.
//!
//! ```ignore
//! use relay_metrics::{PerformanceMonitor, instrument};
//!
//! let monitor = PerformanceMonitor::new();
//! let issues = instrument(&monitor, "github.list_issues", github.list_issues()).await?;
//! assert_eq!(monitor.stats("github.list_issues").unwrap().count, 1);
//! ```

mod instrument;
mod monitor;
mod rate_limited_logger;

pub use instrument::{Instrumented, instrument};
pub use monitor::{
    DEFAULT_RECENT_CAPACITY, MetricSample, MetricStats, MonitorSink, MonitorSnapshot,
    PerformanceMonitor,
};
pub use rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic event count shared across tasks
///
/// Relaxed ordering: counts are reported, never used to synchronize.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
