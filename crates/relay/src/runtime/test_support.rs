//! Fixtures shared by the runtime tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use relay_config::{Config, RegistryConfig, RequestLogConfig};
use relay_secrets::StaticSecretsBackend;
use relay_telemetry::{MemoryTelemetrySink, TelemetryMode, TelemetryTracker};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::Runtime;

/// Upstream API stub: `500` for paths starting with `/fail`, `200 {"ok":true}` otherwise
pub(crate) struct Upstream {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl Upstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    counter.fetch_add(1, Ordering::SeqCst);

                    let head = String::from_utf8_lossy(&buf);
                    let path = head.split_whitespace().nth(1).unwrap_or("/");
                    let (status, body) = if path.contains("/fail") {
                        (500, r#"{"error":"boom"}"#)
                    } else {
                        (200, r#"{"ok":true}"#)
                    };
                    let response = format!(
                        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr, hits }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Temp directory holding a connector registry and request log directory
pub(crate) struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Register a manifest under `<registry>/<name>/manifest.toml`
    pub fn add_manifest(&self, name: &str, manifest: &str) {
        let entry = self.dir.path().join("connectors").join(name);
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join("manifest.toml"), manifest).unwrap();
    }

    /// Config pointing at this workspace; `connectors_toml` is appended as-is
    pub fn config(&self, connectors_toml: &str, max_logs: usize) -> Config {
        let mut config: Config = connectors_toml.parse().unwrap();
        config.registry = RegistryConfig {
            path: self.dir.path().join("connectors"),
            ..RegistryConfig::default()
        };
        config.request_log = RequestLogConfig {
            max_logs,
            unbounded: false,
            directory: Some(self.dir.path().join("request_logs")),
        };
        config
    }
}

/// Runtime with static secrets and telemetry captured in memory
pub(crate) fn runtime(
    config: Config,
    secrets: StaticSecretsBackend,
    mode: TelemetryMode,
) -> (Runtime, Arc<MemoryTelemetrySink>) {
    let sink = Arc::new(MemoryTelemetrySink::new());
    let tracker = TelemetryTracker::new(mode, "install-test", sink.clone());
    (
        Runtime::new(config, Arc::new(secrets), Arc::new(tracker)),
        sink,
    )
}
