//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::ContactRepository;
use crate::metrics::HttpMetrics;
use crate::services::auth::TokenVerifier;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The repository and the token verifier are
/// built once at start-up and injected here; each state gets its own
/// request metrics registry.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    contacts: Arc<dyn ContactRepository>,
    verifier: Option<Arc<dyn TokenVerifier>>,
    metrics: HttpMetrics,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `contacts` - Contact repository
    /// * `verifier` - Bearer token verifier, `None` when the Auth Gate is disabled
    #[must_use]
    pub fn new(
        config: ApiConfig,
        contacts: Arc<dyn ContactRepository>,
        verifier: Option<Arc<dyn TokenVerifier>>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                contacts,
                verifier,
                metrics: HttpMetrics::new(),
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get the contact repository.
    #[must_use]
    pub fn contacts(&self) -> &dyn ContactRepository {
        self.inner.contacts.as_ref()
    }

    /// Get the token verifier, if one is configured.
    #[must_use]
    pub fn verifier(&self) -> Option<&dyn TokenVerifier> {
        self.inner.verifier.as_deref()
    }

    /// Get the request metrics registry.
    #[must_use]
    pub fn metrics(&self) -> &HttpMetrics {
        &self.inner.metrics
    }
}
