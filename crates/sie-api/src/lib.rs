//! SIE API - REST server
//!
//! Provides HTTP endpoints for community discovery, entity resolution and
//! relationship extraction.
//!
//! Author: hephaex@gmail.com

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::{http::HeaderValue, routing::get, Router};
use sie_core::config::ServerConfig;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);
    let openapi = routes::ApiDoc::openapi();

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if !server.cors_enabled {
        return CorsLayer::new();
    }

    if server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Router over an in-memory store and a canned community source
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    let config = sie_core::AppConfig::default();
    let store = Arc::new(sie_core::MemoryStore::new());
    let source = Arc::new(testing::StubCommunitySource);
    create_router(Arc::new(AppState::new(config, store, source)))
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    //! Canned community data for router tests

    use async_trait::async_trait;
    use sie_core::{Result, SieError};
    use sie_discovery::{CommunityInfo, CommunitySource, Post};

    /// Search query that makes [`StubCommunitySource`] fail
    pub const UNREACHABLE_QUERY: &str = "unreachable";

    /// Returns "gardening" plus a community named after the query;
    /// post fetches for "gardening" fail
    pub struct StubCommunitySource;

    #[async_trait]
    impl CommunitySource for StubCommunitySource {
        async fn search_communities(
            &self,
            query: &str,
            limit: usize,
        ) -> Result<Vec<CommunityInfo>> {
            if query == UNREACHABLE_QUERY {
                return Err(SieError::Fetch("search returned 503".to_string()));
            }

            let communities = vec![
                CommunityInfo {
                    name: "gardening".to_string(),
                    subscribers: 0,
                    description: String::new(),
                    title: "Gardening".to_string(),
                },
                CommunityInfo {
                    name: query.to_string(),
                    subscribers: 250_000,
                    description: format!("Everything about {query}"),
                    title: query.to_string(),
                },
            ];
            Ok(communities.into_iter().take(limit).collect())
        }

        async fn recent_posts(&self, community: &str, limit: usize) -> Result<Vec<Post>> {
            if community == "gardening" {
                return Err(SieError::Fetch("r/gardening returned 404".to_string()));
            }

            Ok((0..3)
                .map(|i| Post {
                    id: format!("p{i}"),
                    title: format!("{community} update {i}"),
                    selftext: String::new(),
                    score: 120,
                    num_comments: 30,
                    permalink: format!("https://reddit.com/r/{community}/comments/p{i}/"),
                    created_utc: 1_700_000_000.0,
                })
                .take(limit)
                .collect())
        }
    }
}
