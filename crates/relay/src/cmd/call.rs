//! Call command - one request through a configured connector
//!
//! The request runs through the same path as in `serve`: a fresh session
//! with request logging, instrumentation and telemetry, ended afterwards.
//!
//! # Usage
//!
//! ```bash
//! relay call github GET /repos/rust-lang/rust/issues --query state=open
//! relay call crm POST /contacts --data '{"email":"a@example.com"}'
//! ```

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use relay_connectors::ApiRequest;

use crate::runtime::Runtime;

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Connector id from the config
    pub connector: String,

    /// HTTP method (GET, POST, ...)
    pub method: String,

    /// Path relative to the connector's base URL
    pub path: String,

    /// Query parameter as name=value (repeatable)
    #[arg(short, long)]
    pub query: Vec<String>,

    /// Extra header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Entity name for metrics and telemetry (default: first path segment)
    #[arg(long)]
    pub entity: Option<String>,

    /// Action name for metrics and telemetry (default: lowercase method)
    #[arg(long)]
    pub action: Option<String>,
}

pub async fn run(config_path: Option<&Path>, args: CallArgs) -> Result<()> {
    let loaded = super::load_config(config_path)?;
    if let Some((_, err)) = loaded.rejected.iter().find(|(id, _)| *id == args.connector) {
        bail!("connector '{}' has an invalid config: {}", args.connector, err);
    }
    let connector = loaded
        .config
        .connectors
        .get(&args.connector)
        .cloned()
        .ok_or_else(|| anyhow!("no connector '{}' in config", args.connector))?;

    let request = build_request(&args)?;
    let entity = args.entity.clone().unwrap_or_else(|| default_entity(&args.path));
    let action = args
        .action
        .clone()
        .unwrap_or_else(|| args.method.to_ascii_lowercase());

    let runtime = Runtime::from_config(loaded.config);
    let session = runtime.activate(&connector)?;
    let result = session.call(&entity, &action, request).await;
    runtime.shutdown(vec![session]).await;

    let response = result.with_context(|| format!("{} {} failed", args.method, args.path))?;
    println!("{}", render_body(&response.body));
    Ok(())
}

fn build_request(args: &CallArgs) -> Result<ApiRequest> {
    let mut request = ApiRequest::new(args.method.to_ascii_uppercase(), args.path.clone());

    for pair in &args.query {
        let (name, value) = pair
            .split_once('=')
            .with_context(|| format!("invalid query '{pair}', expected name=value"))?;
        request = request.query(name, value);
    }

    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("invalid header '{header}', expected \"Name: value\""))?;
        request = request.header(name.trim(), value.trim());
    }

    if let Some(data) = &args.data {
        let body = serde_json::from_str(data).context("--data is not valid JSON")?;
        request = request.json(body);
    }

    Ok(request)
}

/// First non-empty path segment, or "root"
fn default_entity(path: &str) -> String {
    path.split(['/', '?'])
        .find(|segment| !segment.is_empty())
        .unwrap_or("root")
        .to_string()
}

/// Pretty JSON when the body parses, otherwise as received
fn render_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(method: &str, path: &str) -> CallArgs {
        CallArgs {
            connector: "github".into(),
            method: method.into(),
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            data: None,
            entity: None,
            action: None,
        }
    }

    #[test]
    fn test_build_request() {
        let mut args = args("post", "/repos/a/b/issues");
        args.query = vec!["state=open".into(), "labels=bug,ui".into()];
        args.headers = vec!["X-Trace:  abc ".into()];
        args.data = Some(r#"{"title":"crash"}"#.into());

        let request = build_request(&args).unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.query["state"], "open");
        assert_eq!(request.query["labels"], "bug,ui");
        assert_eq!(request.headers["X-Trace"], "abc");
        assert_eq!(request.body, Some(serde_json::json!({"title": "crash"})));
    }

    #[test]
    fn test_build_request_rejects_malformed_input() {
        let mut bad_query = args("GET", "/");
        bad_query.query = vec!["state".into()];
        assert!(build_request(&bad_query).is_err());

        let mut bad_data = args("POST", "/");
        bad_data.data = Some("{not json".into());
        assert!(build_request(&bad_data).is_err());
    }

    #[test]
    fn test_default_entity() {
        assert_eq!(default_entity("/repos/a/b"), "repos");
        assert_eq!(default_entity("contacts?limit=1"), "contacts");
        assert_eq!(default_entity("/"), "root");
    }

    #[test]
    fn test_render_body() {
        assert_eq!(render_body(r#"{"a":1}"#), "{\n  \"a\": 1\n}");
        assert_eq!(render_body("plain text"), "plain text");
    }
}
