//! Flush sinks
//!
//! Append-only destinations for flushed entries. A sink must not return
//! `Ok` until the batch is durable (for whatever durability it offers); the
//! logger evicts entries from memory only after that acknowledgement.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;

use crate::entry::RequestLog;
use crate::error::{RequestLogError, Result};

/// Append-only destination for flushed request logs
#[async_trait]
pub trait FlushSink: Send + Sync {
    /// Sink name for logs and errors
    fn name(&self) -> &str;

    /// Append `batch` in order; entries are oldest first
    async fn write_batch(&self, batch: &[RequestLog]) -> Result<()>;
}

/// Appends entries as JSON lines to one file
pub struct JsonlFileSink {
    path: PathBuf,
}

impl JsonlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<directory>/<session_id>.jsonl`
    pub fn for_session(directory: impl AsRef<Path>, session_id: &str) -> Self {
        Self::new(directory.as_ref().join(format!("{session_id}.jsonl")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FlushSink for JsonlFileSink {
    fn name(&self) -> &str {
        "jsonl_file"
    }

    async fn write_batch(&self, batch: &[RequestLog]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::with_capacity(batch.len() * 256);
        for entry in batch {
            serde_json::to_writer(&mut buf, entry)?;
            buf.push(b'\n');
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RequestLogError::io(parent, e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| RequestLogError::io(&self.path, e))?;

        file.write_all(&buf)
            .await
            .map_err(|e| RequestLogError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| RequestLogError::io(&self.path, e))?;
        file.sync_data()
            .await
            .map_err(|e| RequestLogError::io(&self.path, e))?;

        Ok(())
    }
}

/// Keeps flushed entries in memory
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<RequestLog>>,
    batches: Mutex<Vec<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry received, in arrival order
    pub fn entries(&self) -> Vec<RequestLog> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Size of each batch received
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl FlushSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn write_batch(&self, batch: &[RequestLog]) -> Result<()> {
        self.entries.lock().extend_from_slice(batch);
        self.batches.lock().push(batch.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(path: &str) -> RequestLog {
        RequestLog::builder("GET", format!("https://example.com{path}")).build()
    }

    #[tokio::test]
    async fn test_jsonl_appends_in_order() {
        let dir = TempDir::new().unwrap();
        let sink = JsonlFileSink::for_session(dir.path().join("nested"), "session-1");

        sink.write_batch(&[entry("/a"), entry("/b")]).await.unwrap();
        sink.write_batch(&[entry("/c")]).await.unwrap();
        sink.write_batch(&[]).await.unwrap();

        assert_eq!(sink.path(), dir.path().join("nested/session-1.jsonl"));
        let content = std::fs::read_to_string(sink.path()).unwrap();
        let paths: Vec<String> = content
            .lines()
            .map(|line| serde_json::from_str::<RequestLog>(line).unwrap().path)
            .collect();
        assert_eq!(paths, ["/a", "/b", "/c"]);
    }

    #[tokio::test]
    async fn test_jsonl_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let sink = JsonlFileSink::new(blocker.join("log.jsonl"));
        let err = sink.write_batch(&[entry("/a")]).await.unwrap_err();
        assert!(matches!(err, RequestLogError::Io { .. }));
    }

    #[tokio::test]
    async fn test_memory_sink_records_batches() {
        let sink = MemorySink::new();
        sink.write_batch(&[entry("/a"), entry("/b")]).await.unwrap();
        sink.write_batch(&[entry("/c")]).await.unwrap();

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.batch_sizes(), [2, 1]);
    }
}
