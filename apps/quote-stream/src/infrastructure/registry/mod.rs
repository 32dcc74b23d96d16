//! Provider Registry
//!
//! Selects and owns the single active quote source. The registry is an
//! explicit value held in the HTTP app state; the source is built lazily
//! on first use and shared from then on.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::application::ports::SharedProvider;
use crate::infrastructure::broadcast::QuoteBroadcast;
use crate::infrastructure::config::{ConfigError, ProviderKind, ProviderSettings};
use crate::infrastructure::polygon::{PolledProvider, PolygonClientConfig};
use crate::infrastructure::synthetic::SyntheticProvider;

/// Construct the source selected by `settings`.
///
/// # Errors
///
/// Returns `ConfigError::MissingCredential` if the polled source is
/// selected without an API key.
pub fn build_provider(settings: &ProviderSettings) -> Result<SharedProvider, ConfigError> {
    let symbols = settings.tracked_symbols();
    let feed = QuoteBroadcast::new(settings.broadcast_capacity);

    let provider: SharedProvider = match settings.kind {
        ProviderKind::Synthetic => Arc::new(SyntheticProvider::new(
            symbols,
            settings.synthetic_interval,
            feed,
        )),
        ProviderKind::Polled => {
            let credentials = settings
                .credentials
                .clone()
                .ok_or(ConfigError::MissingCredential("POLYGON_API_KEY"))?;
            let client_config = PolygonClientConfig {
                base_url: settings.base_url.clone(),
                credentials,
                timeout: settings.request_timeout,
            };
            Arc::new(PolledProvider::new(
                client_config,
                symbols,
                settings.poll_interval,
                feed,
            ))
        }
    };

    tracing::info!(
        provider = provider.name(),
        symbols = ?provider.tracked_symbols(),
        "Quote provider constructed"
    );
    Ok(provider)
}

/// Lazily constructed, shared active source.
pub struct ProviderRegistry {
    settings: ProviderSettings,
    slot: OnceCell<SharedProvider>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("settings", &self.settings)
            .field("provider", &self.slot.get().map(|p| p.name()))
            .finish()
    }
}

impl ProviderRegistry {
    /// Create a registry that builds its source from `settings` on first use.
    #[must_use]
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            slot: OnceCell::new(),
        }
    }

    /// Create a registry around an already constructed source.
    #[must_use]
    pub fn with_provider(settings: ProviderSettings, provider: SharedProvider) -> Self {
        Self {
            settings,
            slot: OnceCell::new_with(Some(provider)),
        }
    }

    /// Get the active source, constructing it on the first call.
    ///
    /// Concurrent first calls construct exactly one source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if construction fails. A failed construction
    /// is retried on the next call.
    pub async fn provider(&self) -> Result<SharedProvider, ConfigError> {
        self.slot
            .get_or_try_init(|| async { build_provider(&self.settings) })
            .await
            .cloned()
    }

    /// Get the active source if it has already been constructed.
    #[must_use]
    pub fn get(&self) -> Option<SharedProvider> {
        self.slot.get().cloned()
    }

    /// Drop the cached source so the next `provider` call builds a new one.
    ///
    /// The dropped source is not stopped.
    pub fn reset(&mut self) {
        self.slot.take();
    }

    /// Get the settings used for construction.
    #[must_use]
    pub const fn settings(&self) -> &ProviderSettings {
        &self.settings
    }
}

// =============================================================================
// Tests
// =============================================================================
