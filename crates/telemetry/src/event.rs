//! Telemetry events.
//!
//! Three lifecycle events share one [`EventHeader`]. Events are built once
//! and serialized to a flat JSON object for transport; everything sent is
//! visible through `relay telemetry show`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Where the runtime is executing. Collected once per tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionContext {
    /// relay version
    pub runtime_version: String,
    pub os: String,
    pub arch: String,
    pub cpu_cores: u32,
    /// Running under CI (`CI` env var set)
    pub ci: bool,
}

impl ExecutionContext {
    pub fn collect() -> Self {
        Self {
            runtime_version: env!("CARGO_PKG_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_cores: std::thread::available_parallelism()
                .map(|p| p.get() as u32)
                .unwrap_or(1),
            ci: std::env::var_os("CI").is_some_and(|v| !v.is_empty()),
        }
    }
}

/// Fields every event carries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventHeader {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub user_id: String,
    pub context: ExecutionContext,
}

/// A connector was constructed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorInitEvent {
    pub header: EventHeader,
    pub connector_name: String,
    pub connector_version: Option<String>,
    /// "local" or "hosted"
    pub connector_type: String,
    pub credentials_count: usize,
}

/// One connector operation completed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationEvent {
    pub header: EventHeader,
    pub connector_name: String,
    pub entity: String,
    pub action: String,
    pub duration_ms: f64,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

/// A connector session was torn down
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEndEvent {
    pub header: EventHeader,
    pub connector_name: String,
    pub operation_count: u64,
    pub error_count: u64,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    ConnectorInit(ConnectorInitEvent),
    Operation(OperationEvent),
    SessionEnd(SessionEndEvent),
}

impl TelemetryEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ConnectorInit(_) => "connector_init",
            Self::Operation(_) => "operation",
            Self::SessionEnd(_) => "session_end",
        }
    }

    pub fn header(&self) -> &EventHeader {
        match self {
            Self::ConnectorInit(e) => &e.header,
            Self::Operation(e) => &e.header,
            Self::SessionEnd(e) => &e.header,
        }
    }

    /// Flat key/value form sent to the endpoint
    ///
    /// Header and context fields sit at the top level next to the variant's
    /// own fields; timestamps are RFC 3339 UTC.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("event_type".into(), self.event_type().into());
        insert_header(&mut map, self.header());

        match self {
            Self::ConnectorInit(e) => {
                map.insert("connector_name".into(), e.connector_name.clone().into());
                map.insert("connector_version".into(), e.connector_version.clone().into());
                map.insert("connector_type".into(), e.connector_type.clone().into());
                map.insert("credentials_count".into(), e.credentials_count.into());
            }
            Self::Operation(e) => {
                map.insert("connector_name".into(), e.connector_name.clone().into());
                map.insert("entity".into(), e.entity.clone().into());
                map.insert("action".into(), e.action.clone().into());
                map.insert("duration_ms".into(), e.duration_ms.into());
                map.insert("success".into(), e.success.into());
                map.insert("status_code".into(), e.status_code.into());
                map.insert("error".into(), e.error.clone().into());
            }
            Self::SessionEnd(e) => {
                map.insert("connector_name".into(), e.connector_name.clone().into());
                map.insert("operation_count".into(), e.operation_count.into());
                map.insert("error_count".into(), e.error_count.into());
                map.insert("duration_ms".into(), e.duration_ms.into());
            }
        }

        map
    }
}

fn insert_header(map: &mut Map<String, Value>, header: &EventHeader) {
    map.insert(
        "timestamp".into(),
        header
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .into(),
    );
    map.insert("session_id".into(), header.session_id.clone().into());
    map.insert("user_id".into(), header.user_id.clone().into());
    map.insert("runtime_version".into(), header.context.runtime_version.clone().into());
    map.insert("os".into(), header.context.os.clone().into());
    map.insert("arch".into(), header.context.arch.clone().into());
    map.insert("cpu_cores".into(), header.context.cpu_cores.into());
    map.insert("ci".into(), header.context.ci.into());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> EventHeader {
        EventHeader {
            timestamp: DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            session_id: "s-1".into(),
            user_id: "u-1".into(),
            context: ExecutionContext {
                runtime_version: "0.3.0".into(),
                os: "linux".into(),
                arch: "x86_64".into(),
                cpu_cores: 8,
                ci: false,
            },
        }
    }

    #[test]
    fn test_operation_to_map_is_flat() {
        let event = TelemetryEvent::Operation(OperationEvent {
            header: header(),
            connector_name: "github".into(),
            entity: "issues".into(),
            action: "list".into(),
            duration_ms: 12.5,
            success: false,
            status_code: Some(502),
            error: Some("HttpError".into()),
        });

        let map = event.to_map();
        assert_eq!(map["event_type"], "operation");
        assert_eq!(map["timestamp"], "2026-03-01T12:00:00.000Z");
        assert_eq!(map["session_id"], "s-1");
        assert_eq!(map["os"], "linux");
        assert_eq!(map["entity"], "issues");
        assert_eq!(map["status_code"], 502);
        assert_eq!(map["error"], "HttpError");
        assert!(map.values().all(|v| !v.is_object()));
    }

    #[test]
    fn test_connector_init_to_map() {
        let event = TelemetryEvent::ConnectorInit(ConnectorInitEvent {
            header: header(),
            connector_name: "github".into(),
            connector_version: None,
            connector_type: "local".into(),
            credentials_count: 2,
        });

        let map = event.to_map();
        assert_eq!(map["event_type"], "connector_init");
        assert_eq!(map["connector_version"], Value::Null);
        assert_eq!(map["credentials_count"], 2);
    }

    #[test]
    fn test_session_end_to_map() {
        let event = TelemetryEvent::SessionEnd(SessionEndEvent {
            header: header(),
            connector_name: "github".into(),
            operation_count: 10,
            error_count: 1,
            duration_ms: 1500.0,
        });

        let map = event.to_map();
        assert_eq!(map["event_type"], "session_end");
        assert_eq!(map["operation_count"], 10);
        assert_eq!(event.header().user_id, "u-1");
    }

    #[test]
    fn test_context_collect() {
        let context = ExecutionContext::collect();
        assert_eq!(context.os, std::env::consts::OS);
        assert!(context.cpu_cores >= 1);
    }
}
