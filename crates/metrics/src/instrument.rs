//! Instrumentation wrapper
//!
//! Times an async operation and emits one [`MetricSample`] when it finishes,
//! success or failure. The operation's output is returned unchanged.
//!
//! No lock is taken while the operation is pending; the only suspension
//! point is the operation itself.

use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;

use crate::monitor::{MetricSample, MonitorSink};

/// Run `operation`, record its duration and outcome under `metric_name`,
/// and return its result as-is
pub async fn instrument<F, T, E>(sink: &dyn MonitorSink, metric_name: &str, operation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let result = operation.await;
    let elapsed = start.elapsed();

    sink.record(MetricSample::new(metric_name, elapsed, result.is_ok()));
    result
}

/// A callable wrapped with instrumentation
///
/// ```ignore
/// let list_issues = Instrumented::new(monitor.clone(), "github.list_issues", |repo: String| {
///     let client = client.clone();
///     async move { client.list_issues(&repo).await }
/// });
/// let issues = list_issues.call("rust-lang/rust".to_string()).await?;
/// ```
pub struct Instrumented<F> {
    sink: Arc<dyn MonitorSink>,
    metric_name: String,
    operation: F,
}

impl<F> Instrumented<F> {
    pub fn new(sink: Arc<dyn MonitorSink>, metric_name: impl Into<String>, operation: F) -> Self {
        Self {
            sink,
            metric_name: metric_name.into(),
            operation,
        }
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    /// Invoke the wrapped operation with `args`
    pub async fn call<A, Fut, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        instrument(self.sink.as_ref(), &self.metric_name, (self.operation)(args)).await
    }
}
