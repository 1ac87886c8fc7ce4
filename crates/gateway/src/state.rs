// Application state
//
// Shared services are built once at startup and cloned into each route group.

use anyhow::Context;
use promptgate_core::{
    build_embedder, GenerationBackend, GenerationProxy, OllamaGenerator, SimilarityService,
};
use std::sync::Arc;

use crate::auth::AuthState;
use crate::config::GatewayConfig;
use crate::storage::StorageBackend;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub generation: GenerationProxy,
    pub similarity: SimilarityService,
}

impl AppState {
    pub fn new(auth: AuthState, generation: GenerationProxy, similarity: SimilarityService) -> Self {
        Self {
            auth,
            generation,
            similarity,
        }
    }

    /// Connect storage and build the upstream clients and embedding model
    pub async fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let storage = match &config.database_url {
            Some(url) => {
                let storage = StorageBackend::postgres(url).await?;
                tracing::info!("Connected to database");
                storage
            }
            None => {
                tracing::warn!("DATABASE_URL not set, users are kept in memory and lost on restart");
                StorageBackend::in_memory()
            }
        };

        let generator = OllamaGenerator::new(config.generation.clone())?;
        tracing::info!(
            url = %config.generation.api_url,
            model = %config.generation.model,
            timeout_secs = config.generation.timeout.as_secs(),
            "Generation upstream configured"
        );
        let generator: Arc<dyn GenerationBackend> = Arc::new(generator);

        let embedder =
            build_embedder(&config.embedding).context("Failed to initialize embedding backend")?;
        tracing::info!(
            backend = ?config.embedding.backend,
            model = %embedder.model_name(),
            "Embedding backend ready"
        );

        Ok(Self::new(
            AuthState::new(config.auth.clone(), storage),
            GenerationProxy::new(generator),
            SimilarityService::new(embedder),
        ))
    }

    pub fn storage_kind(&self) -> &'static str {
        self.auth.credentials.storage_kind()
    }
}
