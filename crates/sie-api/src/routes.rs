//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::error::ApiError;
use crate::handlers::{discovery, entities, health, relationships};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Discovery endpoints
        .route(
            "/discovery/communities",
            post(discovery::discover_communities),
        )
        // Entity endpoints
        .route("/entities", get(entities::list_entities))
        .route("/entities/resolve", post(entities::resolve_entities))
        .route("/entities/search", get(entities::search_entities))
        .route("/entities/:id", get(entities::get_entity))
        .route("/entities/:id/mentions", get(entities::get_entity_mentions))
        .route(
            "/entities/:id/relationships",
            get(relationships::get_entity_relationships),
        )
        // Relationship endpoints
        .route("/relationships", get(relationships::list_relationships))
        .route(
            "/relationships/extract",
            post(relationships::extract_relationships),
        )
}

/// OpenAPI document
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        discovery::discover_communities,
        entities::resolve_entities,
        entities::list_entities,
        entities::search_entities,
        entities::get_entity,
        entities::get_entity_mentions,
        relationships::extract_relationships,
        relationships::list_relationships,
        relationships::get_entity_relationships,
    ),
    components(schemas(
        ApiError,
        health::HealthResponse,
        discovery::DiscoveryRequest,
        discovery::CommunityInfo,
        discovery::PostInfo,
        entities::ResolveRequest,
        entities::ResolvedEntityInfo,
        entities::EntityInfo,
        entities::MentionInfo,
        relationships::ExtractRequest,
        relationships::ExtractedRelationshipInfo,
        relationships::RelationshipInfo,
    )),
    info(
        title = "Social Intelligence Engine API",
        description = "Community discovery, entity resolution and relationship extraction"
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "discovery", description = "Community discovery for a company"),
        (name = "entities", description = "Entity resolution and lookup"),
        (name = "relationships", description = "Relationship extraction and lookup")
    )
)]
pub struct ApiDoc;
