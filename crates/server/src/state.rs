use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use backend::{
    BackendKind, FixtureBackend, PretixBackend, PretixConfig, TicketingBackend, TitoBackend,
    TitoConfig,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use ticketcheck::EventConfig;
use validation::Validator;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Event configuration the validator was built from
    pub event: Arc<EventConfig>,

    /// Validation engine, owning the snapshot store
    pub validator: Arc<Validator>,

    /// Prometheus renderer, present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Wire a validator for `event` on top of an already built backend.
    pub fn new(
        config: ServerConfig,
        event: EventConfig,
        backend: Arc<dyn TicketingBackend>,
    ) -> Self {
        let validator = Validator::new(
            Arc::new(event.snapshot_store()),
            backend,
            event.mapper(),
            event.validation_policy(config.upstream_timeout()),
        );

        Self {
            config: Arc::new(config),
            event: Arc::new(event),
            validator: Arc::new(validator),
            metrics: None,
        }
    }

    /// Load the event configuration and select the backend `config` names.
    pub async fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let event = EventConfig::load_or_default(&config.event_config_path)?;
        let backend = build_backend(&config).await?;
        tracing::info!(
            backend = backend.name(),
            event = event.name.as_deref().unwrap_or("unnamed"),
            "Ticketing backend selected"
        );
        Ok(Self::new(config, event, backend))
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Build the provider adapter, falling back to the fixture when no token is set.
pub async fn build_backend(config: &ServerConfig) -> ServerResult<Arc<dyn TicketingBackend>> {
    let token = config.api_token.clone().unwrap_or_default();

    let backend: Arc<dyn TicketingBackend> = match config.effective_backend() {
        BackendKind::Tito => {
            let mut tito = TitoConfig::new(
                required(&config.account_slug, "account_slug")?,
                required(&config.event_slug, "event_slug")?,
                token,
            );
            if let Some(url) = &config.base_url {
                tito = tito.with_base_url(url.clone());
            }
            Arc::new(TitoBackend::new(tito)?)
        }
        BackendKind::Pretix => {
            let mut pretix = PretixConfig::new(
                required(&config.account_slug, "account_slug")?,
                required(&config.event_slug, "event_slug")?,
                token,
            );
            if let Some(url) = &config.base_url {
                pretix = pretix.with_base_url(url.clone());
            }
            Arc::new(PretixBackend::new(pretix)?)
        }
        BackendKind::Fixture => Arc::new(FixtureBackend::from_path(config.fixture_path.clone()).await?),
    };

    Ok(backend)
}

fn required(value: &Option<String>, field: &str) -> ServerResult<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServerError::Config(format!("{field} is required for live backends")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_live_backend_requires_slugs() {
        let config = ServerConfig {
            backend: BackendKind::Tito,
            api_token: Some("token".into()),
            event_slug: Some("2025".into()),
            ..ServerConfig::default()
        };
        let err = build_backend(&config).await.err().unwrap();
        assert!(err.to_string().contains("account_slug"));
    }

    #[tokio::test]
    async fn test_pretix_backend_selected_with_token() {
        let config = ServerConfig {
            backend: BackendKind::Pretix,
            api_token: Some("token".into()),
            account_slug: Some("europython".into()),
            event_slug: Some("ep2025".into()),
            base_url: Some("http://127.0.0.1:9".into()),
            ..ServerConfig::default()
        };
        let backend = build_backend(&config).await.unwrap();
        assert_eq!(backend.name(), "pretix");
    }

    #[tokio::test]
    async fn test_missing_fixture_is_config_error() {
        let config = ServerConfig {
            fixture_path: "/nonexistent/event.json".into(),
            ..ServerConfig::default()
        };
        let err = build_backend(&config).await.err().unwrap();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_event_config_file_shapes_the_snapshot() {
        use std::io::Write;

        let mut event_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            event_file,
            "version: \"1.0\"\nname: \"File Conf\"\nexclude_ticket_patterns: [\"luggage\"]"
        )
        .unwrap();
        let config = ServerConfig {
            fixture_path: concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/event.json").into(),
            event_config_path: event_file.path().display().to_string(),
            ..ServerConfig::default()
        };

        let state = ServerState::from_config(config).await.unwrap();
        assert_eq!(state.event.name.as_deref(), Some("File Conf"));

        let summary = state.validator.refresh().await.unwrap();
        assert_eq!(summary.excluded_ticket_types, 1);
        assert_eq!(state.validator.ticket_count(), 5);
        assert!(state
            .validator
            .ticket_types()
            .iter()
            .all(|ticket_type| ticket_type.title != "Luggage Storage"));
    }
}
