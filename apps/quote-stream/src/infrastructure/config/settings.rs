//! Service Configuration Settings
//!
//! Configuration types for the quote stream, loaded from environment variables.

use std::time::Duration;

use crate::domain::quote::Symbol;
use crate::domain::subscription::resolve_symbols;

/// Default tracked symbols when `SYMBOLS` is unset.
const DEFAULT_SYMBOLS: &str = "AAPL,MSFT,TSLA";

/// Default upstream REST base URL.
const DEFAULT_POLYGON_BASE_URL: &str = "https://api.polygon.io";

/// Which upstream source feeds the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// Synthetic generator with no external dependency.
    #[default]
    Synthetic,
    /// Polled external REST source.
    Polled,
}

impl ProviderKind {
    /// Parse provider kind from string. Unrecognized values select the
    /// synthetic source.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "polygon" | "polled" => Self::Polled,
            _ => Self::Synthetic,
        }
    }

    /// Get the provider kind name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Synthetic => "mock",
            Self::Polled => "polygon",
        }
    }
}

/// Upstream API credential.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Create a credential, rejecting empty keys.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Option<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            None
        } else {
            Some(Self { api_key })
        }
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Provider selection and tuning.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Source kind to construct.
    pub kind: ProviderKind,
    /// Credential for the polled source.
    pub credentials: Option<Credentials>,
    /// Raw comma-separated tracked symbol list.
    pub symbols: String,
    /// Generation interval of the synthetic source.
    pub synthetic_interval: Duration,
    /// Poll interval of the external source.
    pub poll_interval: Duration,
    /// Base URL of the external REST API.
    pub base_url: String,
    /// Connect and request timeout for upstream calls.
    pub request_timeout: Duration,
    /// Capacity of the per-provider broadcast channel.
    pub broadcast_capacity: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            credentials: None,
            symbols: DEFAULT_SYMBOLS.to_string(),
            synthetic_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            base_url: DEFAULT_POLYGON_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(5),
            broadcast_capacity: 10_000,
        }
    }
}

impl ProviderSettings {
    /// Resolve the configured symbol list against the known symbols.
    #[must_use]
    pub fn tracked_symbols(&self) -> Vec<Symbol> {
        resolve_symbols(&self.symbols)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP/WebSocket port.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Deployment environment name, reported by readiness checks.
    pub environment: String,
    /// Provider settings.
    pub provider: ProviderSettings,
    /// Server settings.
    pub server: ServerSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            provider: ProviderSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl AppConfig {
    /// Create configuration from environment variables.
    ///
    /// Never fails: a missing credential only becomes an error when the
    /// polled source is actually constructed.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let environment = std::env::var("APP_ENV").unwrap_or(defaults.environment);

        let kind = std::env::var("DATA_PROVIDER")
            .map(|s| ProviderKind::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let credentials = std::env::var("POLYGON_API_KEY")
            .ok()
            .and_then(Credentials::new);

        let provider = ProviderSettings {
            kind,
            credentials,
            symbols: std::env::var("SYMBOLS").unwrap_or(defaults.provider.symbols),
            synthetic_interval: parse_env_duration_secs_f64(
                "MOCK_STREAM_INTERVAL",
                defaults.provider.synthetic_interval,
            ),
            poll_interval: parse_env_duration_secs_f64(
                "POLYGON_POLL_INTERVAL",
                defaults.provider.poll_interval,
            ),
            base_url: std::env::var("POLYGON_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.provider.base_url),
            request_timeout: parse_env_duration_secs_f64(
                "POLYGON_REQUEST_TIMEOUT_SECS",
                defaults.provider.request_timeout,
            ),
            broadcast_capacity: parse_env_usize(
                "QUOTE_BROADCAST_CAPACITY",
                defaults.provider.broadcast_capacity,
            ),
        };

        let server = ServerSettings {
            http_port: parse_env_u16("HTTP_PORT", defaults.server.http_port),
        };

        Self {
            environment,
            provider,
            server,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The polled source was selected without its credential.
    #[error("{0} must be set for the polygon data provider")]
    MissingCredential(&'static str),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default)
}

fn parse_env_duration_secs_f64(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_duration_secs_f64(&v))
        .unwrap_or(default)
}

/// Parse fractional seconds, rejecting non-positive and non-finite values.
fn parse_duration_secs_f64(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}
