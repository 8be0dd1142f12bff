//! Connector runtime
//!
//! Owns the pieces shared by every connector session and turns validated
//! connector configs into live [`ConnectorSession`]s:
//!
//! ```text
//! ConnectorConfig ──▶ SecretsManager ──▶ ConnectorFactory ──▶ ConnectorSession
//!                      (credentials)      (+ RequestLogger)     (+ monitor, telemetry)
//! ```
//!
//! One connector failing to activate never stops the others.

mod session;

use std::sync::Arc;
use std::time::Duration;

use relay_config::{Config, ConfigError, ConnectorConfig};
use relay_connectors::{ConnectorError, ConnectorFactory, ConnectorRegistry};
use relay_metrics::PerformanceMonitor;
use relay_requestlog::{JsonlFileSink, LogSession, RequestLogger};
use relay_secrets::{
    Credentials, DotEnvSecretsBackend, SecretsBackend, SecretsError, SecretsManager,
};
use relay_telemetry::{
    ConnectorInfo, ReporterConfig, ReporterHandle, TelemetryTracker, reporter,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use session::ConnectorSession;

/// How long shutdown waits for the telemetry reporter's final send
const REPORTER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Why one connector could not be activated
#[derive(Debug, Error)]
pub enum ActivationError {
    /// The connector's config table is invalid
    #[error("connector '{id}': invalid configuration: {source}")]
    Configuration {
        id: String,
        #[source]
        source: ConfigError,
    },

    /// Required secrets could not be resolved
    #[error("connector '{id}': {source}")]
    Secrets {
        id: String,
        #[source]
        source: SecretsError,
    },

    /// The connector itself could not be built
    #[error("connector '{id}': construction failed: {source}")]
    Construction {
        id: String,
        #[source]
        source: ConnectorError,
    },
}

impl ActivationError {
    /// Id of the connector that failed
    pub fn connector_id(&self) -> &str {
        match self {
            Self::Configuration { id, .. } | Self::Secrets { id, .. } | Self::Construction { id, .. } => id,
        }
    }

    /// Short label for reports
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Secrets { .. } => "secrets",
            Self::Construction { .. } => "construction",
        }
    }
}

/// Result of activating every configured connector
#[derive(Default)]
pub struct Activation {
    pub sessions: Vec<ConnectorSession>,
    pub failures: Vec<ActivationError>,
}

/// Shared state for all connector sessions
pub struct Runtime {
    config: Config,
    secrets: SecretsManager,
    factory: ConnectorFactory,
    monitor: Arc<PerformanceMonitor>,
    telemetry: Arc<TelemetryTracker>,
    reporter: Option<(ReporterHandle, JoinHandle<()>)>,
}

impl Runtime {
    /// Build from config: environment/dotfile secrets and, unless telemetry
    /// is disabled, a background telemetry reporter
    ///
    /// Must be called within a tokio runtime.
    pub fn from_config(config: Config) -> Self {
        let backend = secrets_backend(&config);
        let mode = config.telemetry.effective_mode();
        let (telemetry, reporter) = if mode.is_disabled() {
            info!("telemetry disabled");
            (TelemetryTracker::disabled(), None)
        } else {
            let mut reporter_config = ReporterConfig::new(config.telemetry.endpoint.clone());
            reporter_config.flush_interval = config.telemetry.flush_interval;
            let (handle, task) = reporter::spawn(reporter_config);
            let tracker = TelemetryTracker::new(mode, install_id(), Arc::new(handle.clone()));
            info!(mode = %mode, endpoint = %config.telemetry.endpoint, "telemetry enabled");
            (tracker, Some((handle, task)))
        };

        let mut runtime = Self::new(config, backend, Arc::new(telemetry));
        runtime.reporter = reporter;
        runtime
    }

    /// Build with explicit secrets backend and telemetry tracker
    pub fn new(config: Config, secrets: Arc<dyn SecretsBackend>, telemetry: Arc<TelemetryTracker>) -> Self {
        let factory = ConnectorFactory::new(
            ConnectorRegistry::new(config.registry.path.clone()),
            config.registry.hosted_url.clone(),
        );

        Self {
            config,
            secrets: SecretsManager::new(secrets),
            factory,
            monitor: Arc::new(PerformanceMonitor::new()),
            telemetry,
            reporter: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn telemetry(&self) -> &Arc<TelemetryTracker> {
        &self.telemetry
    }

    /// Resolve the credentials `connector` maps
    pub fn resolve_credentials(&self, connector: &ConnectorConfig) -> Result<Credentials, ActivationError> {
        self.secrets
            .get_secrets(connector.secrets())
            .map_err(|source| ActivationError::Secrets {
                id: connector.id().to_string(),
                source,
            })
    }

    /// Activate one connector
    ///
    /// Resolves its secrets, opens a request log session and constructs the
    /// connector. Emits a connector-init telemetry event on success.
    pub fn activate(&self, connector: &ConnectorConfig) -> Result<ConnectorSession, ActivationError> {
        let credentials = self.resolve_credentials(connector)?;

        let session = LogSession::with_limit(None, self.config.request_log.max_logs());
        let session_id = session.session_id().to_string();
        let mut logger = RequestLogger::new(session);
        if let Some(dir) = &self.config.request_log.directory {
            logger = logger.with_sink(Arc::new(JsonlFileSink::for_session(dir, &session_id)));
        }
        let logger = Arc::new(logger);

        let built = self
            .factory
            .build(connector, &credentials, Arc::clone(&logger))
            .map_err(|source| ActivationError::Construction {
                id: connector.id().to_string(),
                source,
            })?;
        logger.set_connector_name(built.connector_name());

        self.telemetry.track_connector_init(
            &session_id,
            ConnectorInfo {
                connector_name: built.connector_name(),
                connector_version: built.connector_version(),
                connector_type: connector.connector_type().as_str(),
                credentials_count: credentials.len(),
            },
        );

        info!(
            connector = %connector.id(),
            session = %session_id,
            credentials = credentials.len(),
            "connector activated"
        );

        Ok(ConnectorSession::new(
            connector.id(),
            session_id,
            built,
            logger,
            Arc::clone(&self.monitor),
            Arc::clone(&self.telemetry),
        ))
    }

    /// Activate every enabled connector independently
    ///
    /// `rejected` are connector tables that already failed validation at
    /// load time; they are reported as configuration failures.
    pub fn activate_all(&self, rejected: Vec<(String, ConfigError)>) -> Activation {
        let mut activation = Activation {
            sessions: Vec::new(),
            failures: rejected
                .into_iter()
                .map(|(id, source)| ActivationError::Configuration { id, source })
                .collect(),
        };

        for connector in self.config.connectors.enabled() {
            match self.activate(connector) {
                Ok(session) => activation.sessions.push(session),
                Err(e) => {
                    warn!(connector = %e.connector_id(), stage = e.stage(), error = %e, "activation failed");
                    activation.failures.push(e);
                }
            }
        }

        info!(
            active = activation.sessions.len(),
            failed = activation.failures.len(),
            disabled = self.config.connectors.len() - self.config.connectors.enabled().count(),
            "connectors activated"
        );
        activation
    }

    /// Check that `connector` would activate, without opening a session
    ///
    /// Nothing is logged to disk and no telemetry is emitted.
    pub fn check(&self, connector: &ConnectorConfig) -> Result<(), ActivationError> {
        let credentials = self.resolve_credentials(connector)?;
        let logger = Arc::new(RequestLogger::new(LogSession::new(Some(
            connector.id().to_string(),
        ))));
        self.factory
            .build(connector, &credentials, logger)
            .map(|_| ())
            .map_err(|source| ActivationError::Construction {
                id: connector.id().to_string(),
                source,
            })
    }

    /// End every session, then let the telemetry reporter send what is left
    pub async fn shutdown(self, sessions: Vec<ConnectorSession>) {
        for session in &sessions {
            if let Err(e) = session.end().await {
                warn!(connector = %session.id(), error = %e, "request log final flush failed");
            }
        }

        if let Some((handle, task)) = self.reporter {
            if let Err(e) = handle.shutdown() {
                debug!(error = %e, "telemetry reporter already stopped");
            }
            if tokio::time::timeout(REPORTER_SHUTDOWN_TIMEOUT, task).await.is_err() {
                warn!("telemetry reporter did not stop in time");
            }
        }
    }
}

/// Environment variables first, then the configured dotfile
pub(crate) fn secrets_backend(config: &Config) -> Arc<dyn SecretsBackend> {
    match &config.secrets.dotfile {
        Some(path) => Arc::new(DotEnvSecretsBackend::with_dotfile(path)),
        None => Arc::new(DotEnvSecretsBackend::new()),
    }
}

/// Persisted install id, or a fresh one if the file can't be used
pub(crate) fn install_id() -> String {
    let path = relay_telemetry::default_install_id_path();
    relay_telemetry::load_or_create_install_id(&path).unwrap_or_else(|e| {
        debug!(path = %path.display(), error = %e, "install id not persisted");
        relay_telemetry::generate_install_id()
    })
}

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "runtime_test.rs"]
mod runtime_test;
