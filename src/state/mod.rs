use std::sync::Arc;
use std::sync::RwLock;

use crate::core::config::{AppPaths, Settings};
use crate::core::errors::ApiError;
use crate::index::{SqliteVectorIndex, VectorIndex};
use crate::llm::{GeminiProvider, LlmProvider};
use crate::rag::RagEngine;

pub mod error;

use error::InitializationError;

/// Service lifecycle as reported by `/health`.
///
/// `Initializing` covers the window before the startup probe has confirmed
/// the provider is reachable; `Degraded` means the API credential is missing
/// and only `/health` will answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Initializing,
    Ready,
    Degraded,
}

impl Readiness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Readiness::Initializing => "initializing",
            Readiness::Ready => "ready",
            Readiness::Degraded => "degraded",
        }
    }
}

/// Application state shared across request handlers.
///
/// The vector index and the RAG engine are owned here and handed to
/// handlers through axum's `State`, never through process-global statics.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub index: Arc<dyn VectorIndex>,
    provider: Option<Arc<dyn LlmProvider>>,
    engine: Option<Arc<RagEngine>>,
    readiness: RwLock<Readiness>,
}

impl AppState {
    /// Initializes paths, settings, the vector index, and (when an API
    /// credential is configured) the provider and engine.
    ///
    /// A missing credential is not fatal: the service starts degraded so
    /// `/health` keeps answering while upload/query traffic is refused.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let settings =
            Settings::load(&paths).map_err(|e| InitializationError::Config(e.into()))?;

        let index: Arc<dyn VectorIndex> = Arc::new(
            SqliteVectorIndex::new(&paths)
                .await
                .map_err(|e| InitializationError::Index(e.into()))?,
        );

        let (provider, engine, readiness) = if settings.has_credentials() {
            let provider: Arc<dyn LlmProvider> = Arc::new(
                GeminiProvider::new(&settings.llm)
                    .map_err(|e| InitializationError::Llm(e.into()))?,
            );
            let engine = Arc::new(RagEngine::new(provider.clone(), index.clone(), &settings));
            (Some(provider), Some(engine), Readiness::Initializing)
        } else {
            (None, None, Readiness::Degraded)
        };

        Ok(Arc::new(AppState {
            paths,
            settings,
            index,
            provider,
            engine,
            readiness: RwLock::new(readiness),
        }))
    }

    /// The engine, or a 503 when the service is degraded.
    pub fn engine(&self) -> Result<Arc<RagEngine>, ApiError> {
        self.engine.clone().ok_or(ApiError::ServiceUnavailable)
    }

    pub fn readiness(&self) -> Readiness {
        *self.readiness.read().expect("readiness lock poisoned")
    }

    pub fn set_readiness(&self, readiness: Readiness) {
        *self.readiness.write().expect("readiness lock poisoned") = readiness;
    }

    /// Probes the provider once in the background and flips readiness to
    /// `Ready`. Degraded instances stay degraded.
    pub fn spawn_startup_probe(self: &Arc<Self>) {
        let state = self.clone();
        tokio::spawn(async move {
            let Some(provider) = state.provider.clone() else {
                tracing::warn!("No API credential configured; serving degraded (health only)");
                return;
            };

            match provider.health_check().await {
                Ok(true) => tracing::info!("Provider '{}' reachable", provider.name()),
                Ok(false) => {
                    tracing::warn!("Provider '{}' is not reachable yet", provider.name())
                }
                Err(err) => tracing::warn!("Provider health check failed: {}", err),
            }
            state.set_readiness(Readiness::Ready);
        });
    }
}
