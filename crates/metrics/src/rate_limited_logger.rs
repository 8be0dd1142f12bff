//! Rate-limited error logging
//!
//! A sink that keeps failing (disk full, endpoint down) would otherwise log
//! once per request. [`RateLimitedLogger`] logs at most once per interval
//! and reports how many failures were suppressed in between.
//!
//! ```ignore
//! let logger = RateLimitedLogger::default();
//! for _ in 0..1000 {
//!     logger.error("request log flush failed", &err);
//! }
//! ```

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between two logged failures
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

pub struct RateLimitedLogger {
    min_interval: Duration,
    last_logged: Mutex<Option<Instant>>,
    /// Failures since the last emitted line
    pending: AtomicU64,
    total: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_logged: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Record a failure; returns `true` if a log line was emitted
    pub fn error(&self, message: &str, error: &dyn Display) -> bool {
        if !self.count_and_check() {
            return false;
        }

        let suppressed = self.pending.swap(0, Ordering::Relaxed).saturating_sub(1);
        let total = self.total.load(Ordering::Relaxed);
        tracing::error!(
            error = %error,
            suppressed,
            total_errors = total,
            "{message}"
        );
        true
    }

    /// Same as [`error`](Self::error) at warn level
    pub fn warn(&self, message: &str, error: &dyn Display) -> bool {
        if !self.count_and_check() {
            return false;
        }

        let suppressed = self.pending.swap(0, Ordering::Relaxed).saturating_sub(1);
        let total = self.total.load(Ordering::Relaxed);
        tracing::warn!(
            error = %error,
            suppressed,
            total_errors = total,
            "{message}"
        );
        true
    }

    fn count_and_check(&self) -> bool {
        self.pending.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        let mut last = self.last_logged.lock();
        let now = Instant::now();
        let due = last.is_none_or(|at| now.duration_since(at) >= self.min_interval);
        if due {
            *last = Some(now);
        }
        due
    }

    /// Failures recorded but not yet reported
    pub fn pending_error_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn total_error_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.pending.store(0, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
        *self.last_logged.lock() = None;
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}
