use super::test_support::{Upstream, Workspace, runtime};
use super::*;
use relay_secrets::StaticSecretsBackend;
use relay_telemetry::TelemetryMode;

fn github_manifest(base_url: &str) -> String {
    format!(
        "name = \"github\"\nversion = \"1.2.0\"\nbase_url = \"{base_url}\"\n\n[auth]\ncredential = \"token\"\n"
    )
}

const CONNECTORS: &str = r#"
[connectors.billing]
type = "hosted"
[connectors.billing.secrets]
api_key = "BILLING_KEY"

[connectors.github]
type = "local"
connector_name = "github"
version = "1.2.0"
[connectors.github.secrets]
token = "GITHUB_TOKEN"

[connectors.mystery]
type = "local"
connector_name = "not-registered"

[connectors.off]
type = "hosted"
enabled = false
"#;

// =============================================================================
// Activation
// =============================================================================

#[tokio::test]
async fn test_activate_all_isolates_failures() {
    let upstream = Upstream::start().await;
    let ws = Workspace::new();
    ws.add_manifest("github", &github_manifest(&upstream.url()));

    let (runtime, telemetry) = runtime(
        ws.config(CONNECTORS, 100),
        StaticSecretsBackend::new().with("GITHUB_TOKEN", "ghp_test"),
        TelemetryMode::Enabled,
    );

    let rejected = vec![(
        "broken".to_string(),
        relay_config::ConfigError::missing_connector_source("broken"),
    )];
    let activation = runtime.activate_all(rejected);

    let active: Vec<_> = activation.sessions.iter().map(|s| s.id()).collect();
    assert_eq!(active, ["github"]);

    let failed: Vec<_> = activation
        .failures
        .iter()
        .map(|e| (e.connector_id(), e.stage()))
        .collect();
    assert_eq!(
        failed,
        [
            ("broken", "configuration"),
            ("billing", "secrets"),
            ("mystery", "construction"),
        ]
    );
    assert!(activation.failures[1].to_string().contains("BILLING_KEY"));

    // Only the successful activation emits an init event
    let events = telemetry.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_type"], "connector_init");
    assert_eq!(events[0]["connector_name"], "github");
    assert_eq!(events[0]["connector_version"], "1.2.0");
    assert_eq!(events[0]["connector_type"], "local");
    assert_eq!(events[0]["credentials_count"], 1);
}

#[tokio::test]
async fn test_activate_uses_configured_log_limit() {
    let upstream = Upstream::start().await;
    let ws = Workspace::new();
    ws.add_manifest("github", &github_manifest(&upstream.url()));

    let (runtime, _) = runtime(
        ws.config(CONNECTORS, 7),
        StaticSecretsBackend::new().with("GITHUB_TOKEN", "ghp_test"),
        TelemetryMode::Disabled,
    );

    let config = runtime.config().connectors.get("github").unwrap().clone();
    let session = runtime.activate(&config).unwrap();
    assert_eq!(session.logger().max_logs(), Some(7));
    assert_eq!(session.logger().connector_name().as_deref(), Some("github"));
}

#[tokio::test]
async fn test_log_session_named_after_connector() {
    let upstream = Upstream::start().await;
    let ws = Workspace::new();
    ws.add_manifest("github", &github_manifest(&upstream.url()));

    let connectors = r#"
[connectors.gh-work]
type = "local"
connector_name = "github"
[connectors.gh-work.secrets]
token = "GITHUB_TOKEN"
"#;
    let (runtime, _) = runtime(
        ws.config(connectors, 100),
        StaticSecretsBackend::new().with("GITHUB_TOKEN", "ghp_test"),
        TelemetryMode::Disabled,
    );

    let config = runtime.config().connectors.get("gh-work").unwrap().clone();
    let session = runtime.activate(&config).unwrap();
    assert_eq!(session.id(), "gh-work");
    assert_eq!(session.logger().connector_name().as_deref(), Some("github"));
    assert_eq!(session.logger().summary().connector_name.as_deref(), Some("github"));
}

#[tokio::test]
async fn test_check_does_not_emit_telemetry() {
    let upstream = Upstream::start().await;
    let ws = Workspace::new();
    ws.add_manifest("github", &github_manifest(&upstream.url()));

    let (runtime, telemetry) = runtime(
        ws.config(CONNECTORS, 100),
        StaticSecretsBackend::new().with("GITHUB_TOKEN", "ghp_test"),
        TelemetryMode::Enabled,
    );
    let connectors = &runtime.config().connectors;

    assert!(runtime.check(connectors.get("github").unwrap()).is_ok());
    assert!(matches!(
        runtime.check(connectors.get("billing").unwrap()),
        Err(ActivationError::Secrets { .. })
    ));
    assert!(matches!(
        runtime.check(connectors.get("mystery").unwrap()),
        Err(ActivationError::Construction { .. })
    ));
    assert!(telemetry.is_empty());
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_version_pin_mismatch_fails_construction() {
    let upstream = Upstream::start().await;
    let ws = Workspace::new();
    ws.add_manifest(
        "github",
        &github_manifest(&upstream.url()).replace("1.2.0", "2.0.0"),
    );

    let (runtime, _) = runtime(
        ws.config(CONNECTORS, 100),
        StaticSecretsBackend::new().with("GITHUB_TOKEN", "ghp_test"),
        TelemetryMode::Disabled,
    );

    let config = runtime.config().connectors.get("github").unwrap().clone();
    let err = runtime.activate(&config).err().unwrap();
    assert!(matches!(
        err,
        ActivationError::Construction {
            source: ConnectorError::VersionMismatch { .. },
            ..
        }
    ));
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_shutdown_ends_every_session() {
    let upstream = Upstream::start().await;
    let ws = Workspace::new();
    ws.add_manifest("github", &github_manifest(&upstream.url()));

    let (runtime, telemetry) = runtime(
        ws.config(CONNECTORS, 100),
        StaticSecretsBackend::new()
            .with("GITHUB_TOKEN", "ghp_test")
            .with("BILLING_KEY", "bk_test"),
        TelemetryMode::Enabled,
    );

    let activation = runtime.activate_all(Vec::new());
    assert_eq!(activation.sessions.len(), 2);
    let loggers: Vec<_> = activation
        .sessions
        .iter()
        .map(|s| Arc::clone(s.logger()))
        .collect();

    runtime.shutdown(activation.sessions).await;

    assert!(loggers.iter().all(|l| l.is_closed()));
    let session_ends = telemetry
        .events()
        .iter()
        .filter(|e| e["event_type"] == "session_end")
        .count();
    assert_eq!(session_ends, 2);
}
