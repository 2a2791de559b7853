use std::sync::Arc;

use aisle_api::config::ApiConfig;
use aisle_auth::JwtVerifier;
use aisle_authz::{AuthorizationEngine, EngineConfig, InMemoryResourceDirectory};
use aisle_idp::{HttpIdentityProvider, IdentityProvider, ProviderConfig, StaticProvider};
use aisle_sync::{PermissionCache, SweepConfig, SyncOrchestrator, spawn_sweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aisle_observability::init();

    let config = ApiConfig::from_env();

    let provider: Arc<dyn IdentityProvider> = match &config.provider {
        Some(settings) => Arc::new(HttpIdentityProvider::new(ProviderConfig::new(
            settings.base_url.clone(),
            settings.client_id.clone(),
            settings.client_secret.clone(),
        ))?),
        // Fail-closed dev mode: every uncached subject resolves to empty.
        None => Arc::new(StaticProvider::new()),
    };

    let cache = Arc::new(PermissionCache::new(chrono::Duration::seconds(
        config.cache_ttl_secs,
    )));
    let orchestrator = Arc::new(SyncOrchestrator::new(cache, provider));

    let sweeper = config
        .sweep_enabled
        .then(|| spawn_sweeper(orchestrator.clone(), SweepConfig::default()));

    let verifier = Arc::new(JwtVerifier::hs256(
        config.jwt_secret.as_bytes(),
        config.issuer.clone(),
        config.audience.clone(),
    ));

    // Resource ownership lookups are wired by the host application in
    // production; the standalone binary starts with an empty directory.
    let directory = Arc::new(InMemoryResourceDirectory::new());

    let engine = Arc::new(AuthorizationEngine::new(
        verifier,
        orchestrator,
        directory,
        EngineConfig::default(),
    ));

    let app = aisle_api::app::build_app(engine);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }

    Ok(())
}
