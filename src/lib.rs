//! VQA Gateway
//!
//! A visual question answering service with:
//! - Pluggable answering backends selected by configuration name
//! - API-key authentication with prefix-indexed, hash-verified lookup
//! - A confidence-gated selector inside the locally-hosted backend

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use futures::FutureExt;
use tracing::info;

use api::state::AppState;
use domain::api_key::ApiKeyRepository;
use domain::vqa::VqaPort;
use domain::{DomainError, Registry};
use infrastructure::api_key::{
    InMemoryApiKeyRepository, MongoApiKeyRepository, IN_MEMORY_REPOSITORY_NAME,
    MONGO_REPOSITORY_NAME,
};
use infrastructure::auth::{Argon2KeyHasher, KeyHasher};
use infrastructure::vqa::smsa::VisionEngine;
use infrastructure::vqa::{HttpClient, SmsaBackend, VlmBackend, SMSA_BACKEND_NAME, VLM_BACKEND_NAME};

/// Assemble the answering backend registry.
///
/// Registration is explicit and happens here, during single-threaded
/// startup, before the registry is first queried. The SMSA backend needs
/// a vision engine, which is linked in by the embedder; without one, only
/// the remote VLM backend is available.
pub fn backend_registry(
    config: &AppConfig,
    engine: Option<Arc<dyn VisionEngine>>,
) -> Result<Registry<dyn VqaPort>, DomainError> {
    let mut registry: Registry<dyn VqaPort> = Registry::new("answering backend");

    let vlm_config = config.vlm.clone();
    registry.register(VLM_BACKEND_NAME, move || {
        let vlm_config = vlm_config.clone();
        async move {
            let backend = VlmBackend::new(HttpClient::new(), vlm_config)?;
            Ok(Arc::new(backend) as Arc<dyn VqaPort>)
        }
        .boxed()
    })?;

    if let Some(engine) = engine {
        let smsa_config = config.smsa.clone();
        registry.register(SMSA_BACKEND_NAME, move || {
            let engine = engine.clone();
            let smsa_config = smsa_config.clone();
            async move {
                let backend = SmsaBackend::new(engine, &smsa_config)?;
                Ok(Arc::new(backend) as Arc<dyn VqaPort>)
            }
            .boxed()
        })?;
    }

    Ok(registry)
}

/// Assemble the API key repository registry.
pub fn repository_registry(
    config: &AppConfig,
    hasher: Arc<dyn KeyHasher>,
) -> Result<Registry<dyn ApiKeyRepository>, DomainError> {
    let mut registry: Registry<dyn ApiKeyRepository> = Registry::new("API key repository");

    let auth = config.auth.clone();
    let mongo_hasher = hasher.clone();
    registry.register(MONGO_REPOSITORY_NAME, move || {
        let auth = auth.clone();
        let hasher = mongo_hasher.clone();
        async move {
            let repository =
                MongoApiKeyRepository::connect(&auth.mongodb_uri, &auth.mongodb_database, hasher)
                    .await?;
            Ok(Arc::new(repository) as Arc<dyn ApiKeyRepository>)
        }
        .boxed()
    })?;

    registry.register(IN_MEMORY_REPOSITORY_NAME, move || {
        let hasher = hasher.clone();
        async move { Ok(Arc::new(InMemoryApiKeyRepository::new(hasher)) as Arc<dyn ApiKeyRepository>) }
            .boxed()
    })?;

    Ok(registry)
}

/// Compose the application state from configuration.
pub async fn create_app_state(config: &AppConfig) -> Result<AppState, DomainError> {
    create_app_state_with_engine(config, None).await
}

/// Compose the application state, making the SMSA backend available
/// through the supplied vision engine.
pub async fn create_app_state_with_engine(
    config: &AppConfig,
    engine: Option<Arc<dyn VisionEngine>>,
) -> Result<AppState, DomainError> {
    let hasher: Arc<dyn KeyHasher> = Arc::new(Argon2KeyHasher::new());

    let backends = backend_registry(config, engine)?;
    let repositories = repository_registry(config, hasher)?;

    info!(
        backends = ?backends.list(),
        repositories = ?repositories.list(),
        "Registries populated"
    );

    // Resolved once; both instances are shared for the process lifetime.
    let vqa = backends.resolve(&config.vqa.backend).await?;
    let api_keys = repositories.resolve(&config.auth.repository).await?;

    info!(
        backend = %config.vqa.backend,
        repository = %config.auth.repository,
        "Service composed"
    );

    Ok(AppState::new(vqa, api_keys))
}

/// Resolve only the configured API key repository (operator tooling).
pub async fn create_api_key_repository(
    config: &AppConfig,
) -> Result<Arc<dyn ApiKeyRepository>, DomainError> {
    let hasher: Arc<dyn KeyHasher> = Arc::new(Argon2KeyHasher::new());
    repository_registry(config, hasher)?
        .resolve(&config.auth.repository)
        .await
}
