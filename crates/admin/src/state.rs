//! Application state shared across handlers.

use std::sync::Arc;

use supernova_core::User;
use thiserror::Error;

use crate::config::AdminConfig;
use crate::gemini::{GeminiClient, GeminiError};
use crate::registry::{RegistryClient, RegistryError};
use crate::services::{AssistantBridge, AuthGate, MetricsCache, RegistryFetcher, SyncError};
use crate::session::SessionStore;

/// Errors building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("registry client: {0}")]
    Registry(#[from] RegistryError),
    #[error("gemini client: {0}")]
    Gemini(#[from] GeminiError),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    registry: RegistryClient,
    auth: AuthGate<RegistryClient>,
    sync: RegistryFetcher<RegistryClient>,
    metrics: MetricsCache,
    assistant: AssistantBridge<GeminiClient>,
}

impl AppState {
    /// Build the state. The auth gate restores any session held by `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: AdminConfig, store: Arc<dyn SessionStore>) -> Result<Self, StateError> {
        let registry = RegistryClient::new(config.registry())?;
        let gemini = GeminiClient::new(config.gemini())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                auth: AuthGate::new(registry.clone(), store),
                sync: RegistryFetcher::new(registry.clone(), config.registry().cold_start_after),
                metrics: MetricsCache::default(),
                assistant: AssistantBridge::new(gemini),
                registry,
                config,
            }),
        })
    }

    /// Get the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get the registry client.
    #[must_use]
    pub fn registry(&self) -> &RegistryClient {
        &self.inner.registry
    }

    /// Get the auth gate.
    #[must_use]
    pub fn auth(&self) -> &AuthGate<RegistryClient> {
        &self.inner.auth
    }

    /// Get the registry fetcher.
    #[must_use]
    pub fn sync(&self) -> &RegistryFetcher<RegistryClient> {
        &self.inner.sync
    }

    /// Get the dashboard snapshot cache.
    #[must_use]
    pub fn metrics(&self) -> &MetricsCache {
        &self.inner.metrics
    }

    /// Get the assistant bridge.
    #[must_use]
    pub fn assistant(&self) -> &AssistantBridge<GeminiClient> {
        &self.inner.assistant
    }

    /// Re-fetch the registry with the current operator's token.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure; it is also recorded in the sync status.
    pub async fn sync_now(&self) -> Result<Arc<Vec<User>>, SyncError> {
        let token = self.auth().token().await;
        self.sync().fetch_all(token.as_ref()).await
    }

    /// Run a sync in the background, logging the outcome.
    pub fn spawn_sync(&self) {
        let state = self.clone();
        tokio::spawn(async move {
            if let Err(e) = state.sync_now().await {
                tracing::warn!(error = %e, "Background sync failed");
            }
        });
    }
}
