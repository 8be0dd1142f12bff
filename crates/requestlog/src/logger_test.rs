use super::*;
use crate::error::RequestLogError;
use crate::sink::{JsonlFileSink, MemorySink};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

// =============================================================================
// Helpers
// =============================================================================

fn entry(i: usize) -> RequestLog {
    RequestLog::builder("GET", format!("https://api.example.com/items/{i}"))
        .response(200, None)
        .duration(Duration::from_millis(10))
        .build()
}

fn failed(i: usize) -> RequestLog {
    RequestLog::builder("GET", format!("https://api.example.com/items/{i}"))
        .response(500, Some("boom".into()))
        .duration(Duration::from_millis(30))
        .build()
}

fn paths(entries: &[RequestLog]) -> Vec<String> {
    entries.iter().map(|e| e.path.clone()).collect()
}

fn bounded(max: usize, sink: Arc<dyn FlushSink>) -> RequestLogger {
    RequestLogger::new(LogSession::with_limit(Some("test".into()), Some(max))).with_sink(sink)
}

/// Sink that fails while `failing` is set
#[derive(Default)]
struct FlakySink {
    inner: MemorySink,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl FlakySink {
    fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl FlushSink for FlakySink {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn write_batch(&self, batch: &[RequestLog]) -> crate::error::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RequestLogError::sink("flaky", "disk full"));
        }
        self.inner.write_batch(batch).await
    }
}

/// Sink whose first write waits until `release` is notified
struct StalledSink {
    inner: MemorySink,
    stalled: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl StalledSink {
    fn new() -> Self {
        Self {
            inner: MemorySink::new(),
            stalled: AtomicBool::new(true),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl FlushSink for StalledSink {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn write_batch(&self, batch: &[RequestLog]) -> crate::error::Result<()> {
        if self.stalled.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.write_batch(batch).await
    }
}

// =============================================================================
// Bounded buffer
// =============================================================================

#[tokio::test]
async fn test_overflow_flushes_exactly_the_excess_in_order() {
    let sink = Arc::new(MemorySink::new());
    let logger = bounded(5, sink.clone());

    for i in 0..12 {
        logger.record(entry(i)).await;
    }

    assert_eq!(logger.len(), 5);
    assert_eq!(sink.len(), 7);

    // Sink then memory reconstructs the full history with no gap or overlap
    let mut all = paths(&sink.entries());
    all.extend(paths(&logger.entries()));
    let expected: Vec<String> = (0..12).map(|i| format!("/items/{i}")).collect();
    assert_eq!(all, expected);

    let metrics = logger.metrics().snapshot();
    assert_eq!(metrics.flushed, 7);
    assert_eq!(metrics.evicted, 7);
    assert_eq!(metrics.dropped, 0);
}

#[tokio::test]
async fn test_under_limit_never_touches_sink() {
    let sink = Arc::new(MemorySink::new());
    let logger = bounded(5, sink.clone());

    for i in 0..5 {
        logger.record(entry(i)).await;
    }

    assert_eq!(logger.len(), 5);
    assert!(sink.is_empty());
    assert_eq!(logger.unflushed(), 5);
}

#[tokio::test]
async fn test_flush_then_overflow_evicts_without_rewriting() {
    let sink = Arc::new(MemorySink::new());
    let logger = bounded(3, sink.clone());

    for i in 0..3 {
        logger.record(entry(i)).await;
    }
    assert_eq!(logger.flush().await.unwrap(), 3);

    logger.record(entry(3)).await;
    logger.record(entry(4)).await;

    // 0..3 were already on the sink; overflow only evicts
    assert_eq!(sink.len(), 3);
    assert_eq!(sink.batch_sizes(), [3]);
    assert_eq!(paths(&logger.entries()), ["/items/2", "/items/3", "/items/4"]);
    assert_eq!(logger.unflushed(), 2);

    assert_eq!(logger.flush().await.unwrap(), 2);
    assert_eq!(
        paths(&sink.entries()),
        ["/items/0", "/items/1", "/items/2", "/items/3", "/items/4"]
    );
}

#[tokio::test]
async fn test_zero_limit_streams_to_sink() {
    let sink = Arc::new(MemorySink::new());
    let logger = bounded(0, sink.clone());

    logger.record(entry(0)).await;
    logger.record(entry(1)).await;

    assert!(logger.is_empty());
    assert_eq!(paths(&sink.entries()), ["/items/0", "/items/1"]);
}

#[tokio::test]
async fn test_without_sink_overflow_is_dropped() {
    let logger = RequestLogger::new(LogSession::with_limit(None, Some(2)));

    for i in 0..5 {
        logger.record(entry(i)).await;
    }

    assert_eq!(paths(&logger.entries()), ["/items/3", "/items/4"]);
    assert_eq!(logger.metrics().snapshot().dropped, 3);
    assert_eq!(logger.flush().await.unwrap(), 0);
    assert_eq!(logger.summary().total_recorded, 5);
}

#[tokio::test]
async fn test_unbounded_never_evicts() {
    let sink = Arc::new(MemorySink::new());
    let logger = RequestLogger::new(LogSession::with_limit(None, None)).with_sink(sink.clone());

    for i in 0..50 {
        logger.record(entry(i)).await;
    }
    assert_eq!(logger.len(), 50);
    assert!(sink.is_empty());

    assert_eq!(logger.flush().await.unwrap(), 50);
    assert_eq!(logger.len(), 50);
    assert_eq!(sink.len(), 50);
    assert_eq!(logger.metrics().snapshot().evicted, 0);
}

// =============================================================================
// Flush
// =============================================================================

#[tokio::test]
async fn test_flush_is_idempotent() {
    let sink = Arc::new(MemorySink::new());
    let logger = bounded(100, sink.clone());

    for i in 0..4 {
        logger.record(entry(i)).await;
    }

    assert_eq!(logger.flush().await.unwrap(), 4);
    assert_eq!(logger.flush().await.unwrap(), 0);
    assert_eq!(sink.len(), 4);
    assert_eq!(logger.len(), 4);
    assert_eq!(logger.unflushed(), 0);

    logger.record(entry(4)).await;
    assert_eq!(logger.flush().await.unwrap(), 1);
    assert_eq!(sink.len(), 5);
}

#[tokio::test]
async fn test_failed_flush_keeps_entries_in_memory() {
    let sink = Arc::new(FlakySink::failing());
    let logger = bounded(3, sink.clone());

    for i in 0..6 {
        logger.record(entry(i)).await;
    }

    // Nothing acknowledged, nothing evicted; the buffer exceeds its limit
    assert_eq!(logger.len(), 6);
    assert!(sink.inner.is_empty());
    let metrics = logger.metrics().snapshot();
    assert_eq!(metrics.flush_failures, 3);
    assert_eq!(metrics.evicted, 0);
    assert_eq!(metrics.dropped, 0);

    assert!(logger.flush().await.is_err());
    assert_eq!(logger.len(), 6);

    // The next record retries the whole overflow
    sink.recover();
    logger.record(entry(6)).await;
    assert_eq!(logger.len(), 3);
    assert_eq!(
        paths(&sink.inner.entries()),
        ["/items/0", "/items/1", "/items/2", "/items/3"]
    );
    assert_eq!(paths(&logger.entries()), ["/items/4", "/items/5", "/items/6"]);
}

// =============================================================================
// Session end
// =============================================================================

#[tokio::test]
async fn test_end_session_flushes_and_is_idempotent() {
    let sink = Arc::new(MemorySink::new());
    let logger = bounded(10, sink.clone());

    for i in 0..3 {
        logger.record(entry(i)).await;
    }

    assert_eq!(logger.end_session().await.unwrap(), 3);
    assert!(logger.is_closed());
    assert_eq!(logger.end_session().await.unwrap(), 0);
    assert_eq!(sink.len(), 3);
    assert_eq!(sink.batch_sizes(), [3]);
}

#[tokio::test]
async fn test_end_session_failure_leaves_session_open() {
    let sink = Arc::new(FlakySink::failing());
    let logger = bounded(10, sink.clone());
    logger.record(entry(0)).await;

    assert!(logger.end_session().await.is_err());
    assert!(!logger.is_closed());

    sink.recover();
    assert_eq!(logger.end_session().await.unwrap(), 1);
    assert!(logger.is_closed());
}

#[tokio::test]
async fn test_record_after_end_writes_through() {
    let sink = Arc::new(MemorySink::new());
    let logger = bounded(10, sink.clone());

    logger.record(entry(0)).await;
    logger.end_session().await.unwrap();
    logger.record(entry(1)).await;

    assert_eq!(paths(&sink.entries()), ["/items/0", "/items/1"]);
    assert_eq!(logger.summary().total_recorded, 2);
    // Closed buffer is not extended
    assert_eq!(logger.unflushed(), 0);
}

#[tokio::test]
async fn test_record_after_end_without_sink_is_dropped() {
    let logger = RequestLogger::new(LogSession::new(None));
    logger.end_session().await.unwrap();
    logger.record(entry(0)).await;

    assert!(logger.is_empty());
    assert_eq!(logger.metrics().snapshot().dropped, 1);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_recorders_lose_nothing() {
    let sink = Arc::new(MemorySink::new());
    let logger = Arc::new(bounded(10, sink.clone()));

    let mut handles = Vec::new();
    for task in 0..8 {
        let logger = Arc::clone(&logger);
        handles.push(tokio::spawn(async move {
            for i in 0..50 {
                logger.record(entry(task * 1000 + i)).await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(logger.len(), 10);
    assert_eq!(sink.len(), 390);

    let mut seen = HashSet::new();
    for path in paths(&sink.entries())
        .into_iter()
        .chain(paths(&logger.entries()))
    {
        assert!(seen.insert(path), "duplicate entry");
    }
    assert_eq!(seen.len(), 400);
}

#[tokio::test]
async fn test_stalled_sink_does_not_block_appends() {
    let sink = Arc::new(StalledSink::new());
    let logger = Arc::new(bounded(1, sink.clone()));
    logger.record(entry(0)).await;

    // This record starts a flush that hangs in the sink
    let flusher = {
        let logger = Arc::clone(&logger);
        tokio::spawn(async move { logger.record(entry(1)).await })
    };
    sink.entered.notified().await;

    tokio::time::timeout(Duration::from_millis(200), logger.record(entry(2)))
        .await
        .expect("append waited on another caller's sink write");
    assert_eq!(logger.len(), 3);
    assert_eq!(logger.unflushed(), 3);

    // The flusher picks up what was appended while it was stalled
    sink.release.notify_one();
    flusher.await.unwrap();

    assert_eq!(paths(&sink.inner.entries()), ["/items/0", "/items/1"]);
    assert_eq!(paths(&logger.entries()), ["/items/2"]);
    assert_eq!(logger.unflushed(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_end_session_concurrent_with_record() {
    let sink = Arc::new(MemorySink::new());
    let logger = Arc::new(bounded(5, sink.clone()));

    let recorder = {
        let logger = Arc::clone(&logger);
        tokio::spawn(async move {
            for i in 0..100 {
                logger.record(entry(i)).await;
            }
        })
    };
    let closer = {
        let logger = Arc::clone(&logger);
        tokio::spawn(async move { logger.end_session().await })
    };

    recorder.await.unwrap();
    closer.await.unwrap().unwrap();
    logger.end_session().await.unwrap();

    // Every entry is on the sink exactly once
    let on_sink = paths(&sink.entries());
    let unique: HashSet<_> = on_sink.iter().collect();
    assert_eq!(unique.len(), on_sink.len());
    assert_eq!(on_sink.len() + logger.unflushed(), 100);
    assert_eq!(logger.unflushed(), 0);
}

// =============================================================================
// Queries
// =============================================================================

#[tokio::test]
async fn test_queries() {
    let logger = RequestLogger::new(LogSession::new(Some("github".into())));
    logger.record(entry(0)).await;
    logger.record(failed(1)).await;
    logger.record(entry(2)).await;

    assert_eq!(paths(&logger.recent(2)), ["/items/1", "/items/2"]);
    assert_eq!(logger.recent(10).len(), 3);
    assert_eq!(paths(&logger.errors()), ["/items/1"]);
    assert_eq!(
        paths(&logger.find(|e| e.path.ends_with('2'))),
        ["/items/2"]
    );

    let summary = logger.summary();
    assert_eq!(summary.connector_name.as_deref(), Some("github"));
    assert_eq!(summary.total_recorded, 3);
    assert_eq!(summary.in_memory, 3);
    assert_eq!(summary.failed_requests, 1);
    assert!((summary.avg_duration_ms - 50.0 / 3.0).abs() < 1e-9);
    assert!(!summary.closed);
}

#[tokio::test]
async fn test_export_json() {
    let session = LogSession::new(Some("github".into())).with_session_id("s-1");
    let logger = RequestLogger::new(session);
    logger.record(entry(0)).await;

    let json: serde_json::Value = serde_json::from_str(&logger.export_json().unwrap()).unwrap();
    assert_eq!(json["session_id"], "s-1");
    assert_eq!(json["connector_name"], "github");
    assert_eq!(json["max_logs"], 10_000);
    assert_eq!(json["logs"][0]["path"], "/items/0");
}

// =============================================================================
// File sink
// =============================================================================

#[tokio::test]
async fn test_jsonl_sink_holds_full_history() {
    let dir = TempDir::new().unwrap();
    let session = LogSession::with_limit(None, Some(4)).with_session_id("abc");
    let sink = Arc::new(JsonlFileSink::for_session(dir.path(), "abc"));
    let logger = RequestLogger::new(session).with_sink(sink.clone());

    for i in 0..10 {
        logger.record(entry(i)).await;
    }
    logger.end_session().await.unwrap();

    let content = std::fs::read_to_string(dir.path().join("abc.jsonl")).unwrap();
    let on_disk: Vec<String> = content
        .lines()
        .map(|l| serde_json::from_str::<RequestLog>(l).unwrap().path)
        .collect();
    let expected: Vec<String> = (0..10).map(|i| format!("/items/{i}")).collect();
    assert_eq!(on_disk, expected);
}
