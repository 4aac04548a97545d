use backend::BackendKind;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Ticketing provider
    #[serde(default)]
    pub backend: BackendKind,

    /// Provider API token; without one the fixture backend is used
    #[serde(default)]
    pub api_token: Option<String>,

    /// Overrides the provider's default API URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Tito account or Pretix organizer slug
    #[serde(default)]
    pub account_slug: Option<String>,

    #[serde(default)]
    pub event_slug: Option<String>,

    /// JSON fixture served by the fixture backend
    #[serde(default = "default_fixture_path")]
    pub fixture_path: String,

    /// YAML event configuration; optional
    #[serde(default = "default_event_config_path")]
    pub event_config_path: String,

    /// Bound on every live search and refresh fetch, in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Periodic refresh interval in seconds; unset disables it
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,

    #[serde(default = "default_true")]
    pub refresh_on_startup: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            backend: BackendKind::default(),
            api_token: None,
            base_url: None,
            account_slug: None,
            event_slug: None,
            fixture_path: default_fixture_path(),
            event_config_path: default_event_config_path(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            refresh_interval_secs: None,
            refresh_on_startup: default_true(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, environment variables and config files
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("TICKETCHECK").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Periodic refresh interval, if enabled. Zero counts as disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Backend that will actually be used.
    ///
    /// A live provider without an API token falls back to the fixture.
    pub fn effective_backend(&self) -> BackendKind {
        let has_token = self
            .api_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty());
        if self.backend.is_remote() && !has_token {
            tracing::warn!(
                backend = %self.backend,
                fixture = %self.fixture_path,
                "No API token configured, falling back to the fixture backend"
            );
            return BackendKind::Fixture;
        }
        self.backend
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fixture_path() -> String {
    "fixtures/event.json".to_string()
}

fn default_event_config_path() -> String {
    "event_config.yml".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    15
}
