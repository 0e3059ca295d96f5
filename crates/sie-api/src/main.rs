//! SIE API Server
//!
//! REST API server for the social intelligence engine.
//!
//! Author: hephaex@gmail.com

use sie_api::{create_router, state::AppState};
use sie_core::{AppConfig, KnowledgeStore, MemoryStore, PgStore, StoreKind};
use sie_discovery::RedditClient;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration, from a TOML file when SIE_CONFIG points at one
    let config = match std::env::var("SIE_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.validate()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sie_api=debug,tower_http=debug".into());
    if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Open the entity store
    let store: Arc<dyn KnowledgeStore> = match config.database.store {
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreKind::Postgres => {
            let store = PgStore::new(
                &config.database.postgres_url,
                config.database.postgres_pool_size,
            )
            .await?;
            store.migrate().await?;
            tracing::info!("Connected to PostgreSQL");
            Arc::new(store)
        }
    };

    let source = Arc::new(RedditClient::new(&config.discovery)?);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config, store, source));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("SIE API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
