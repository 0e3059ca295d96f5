//! Entity resolution handlers
//!
//! Author: hephaex@gmail.com

use crate::error::{ApiError, AppError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sie_core::{Entity, EntityId, EntityMention, EntityType, Page};
use sie_extractor::resolver::DEFAULT_SEARCH_LIMIT;
use sie_extractor::ResolvedEntity;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use super::{default_limit, MAX_LIMIT};

/// Free text to resolve
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveRequest {
    #[serde(default)]
    #[schema(example = "Sam Altman replied to @openai about the launch")]
    pub text: String,
}

/// Entity touched by a resolution call
#[derive(Debug, Serialize, ToSchema)]
pub struct ResolvedEntityInfo {
    pub id: EntityId,
    #[schema(example = "Sam Altman")]
    pub canonical_name: String,
    #[schema(example = "other")]
    pub entity_type: String,
    pub confidence_score: f64,
}

impl From<ResolvedEntity> for ResolvedEntityInfo {
    fn from(entity: ResolvedEntity) -> Self {
        Self {
            id: entity.id,
            canonical_name: entity.canonical_name,
            entity_type: entity.entity_type.to_string(),
            confidence_score: entity.confidence_score,
        }
    }
}

/// Stored entity
#[derive(Debug, Serialize, ToSchema)]
pub struct EntityInfo {
    pub id: EntityId,
    pub canonical_name: String,
    /// person, company, product, unknown or other
    #[schema(example = "company")]
    pub entity_type: String,
    pub confidence_score: f64,
    /// RFC 3339 creation time
    pub created_at: String,
}

impl From<Entity> for EntityInfo {
    fn from(entity: Entity) -> Self {
        Self {
            id: entity.id,
            canonical_name: entity.canonical_name,
            entity_type: entity.entity_type.to_string(),
            confidence_score: entity.confidence_score,
            created_at: entity.created_at.to_rfc3339(),
        }
    }
}

/// Surface form recorded under an entity
#[derive(Debug, Serialize, ToSchema)]
pub struct MentionInfo {
    pub id: EntityId,
    pub entity_id: EntityId,
    pub mention_text: String,
    pub context: String,
    pub source_url: Option<String>,
    pub confidence_score: f64,
    pub created_at: String,
}

impl From<EntityMention> for MentionInfo {
    fn from(mention: EntityMention) -> Self {
        Self {
            id: mention.id,
            entity_id: mention.entity_id,
            mention_text: mention.mention_text,
            context: mention.context,
            source_url: mention.source_url,
            confidence_score: mention.confidence_score,
            created_at: mention.created_at.to_rfc3339(),
        }
    }
}

/// Query parameters for entity listing
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEntitiesQuery {
    /// Rows to skip
    #[serde(default)]
    pub skip: usize,

    /// Limit results
    #[serde(default = "default_limit")]
    #[param(default = 100)]
    pub limit: usize,

    /// Filter by entity type
    pub entity_type: Option<String>,
}

/// Query parameters for entity search
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchEntitiesQuery {
    /// Case-insensitive substring of the canonical name
    #[serde(default)]
    pub query: String,

    /// Limit results
    #[serde(default = "default_search_limit")]
    #[param(default = 20)]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

/// Resolve entities mentioned in free text
#[utoipa::path(
    post,
    path = "/api/v1/entities/resolve",
    tag = "entities",
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "Resolved entities", body = Vec<ResolvedEntityInfo>),
        (status = 400, description = "Empty text", body = ApiError)
    )
)]
pub async fn resolve_entities(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResolveRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }

    let resolved = state.resolver.resolve_entities_in_text(&req.text).await?;
    let body: Vec<ResolvedEntityInfo> = resolved.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

/// List entities
#[utoipa::path(
    get,
    path = "/api/v1/entities",
    tag = "entities",
    params(ListEntitiesQuery),
    responses(
        (status = 200, description = "Entity list", body = Vec<EntityInfo>)
    )
)]
pub async fn list_entities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListEntitiesQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let entity_type = match params.entity_type.as_deref() {
        None | Some("") => None,
        Some(name) => match EntityType::from_name(name) {
            Some(t) => Some(t),
            // No stored entity can carry an unknown type name
            None => return Ok(Json(Vec::<EntityInfo>::new())),
        },
    };

    let page = Page::new(params.skip, params.limit.min(MAX_LIMIT));
    let entities = state.resolver.list_entities(page, entity_type).await?;
    let body: Vec<EntityInfo> = entities.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

/// Search entities by name
#[utoipa::path(
    get,
    path = "/api/v1/entities/search",
    tag = "entities",
    params(SearchEntitiesQuery),
    responses(
        (status = 200, description = "Matching entities", body = Vec<EntityInfo>),
        (status = 400, description = "Empty query", body = ApiError)
    )
)]
pub async fn search_entities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchEntitiesQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("query must not be empty".to_string()));
    }

    let entities = state
        .resolver
        .search_entities(query, params.limit.min(MAX_LIMIT))
        .await?;
    let body: Vec<EntityInfo> = entities.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

/// Get entity by ID
#[utoipa::path(
    get,
    path = "/api/v1/entities/{id}",
    tag = "entities",
    params(
        ("id" = i64, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Entity", body = EntityInfo),
        (status = 404, description = "Entity not found", body = ApiError)
    )
)]
pub async fn get_entity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<EntityId>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let entity = state
        .resolver
        .get_entity(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Entity {id}")))?;
    Ok(Json(EntityInfo::from(entity)))
}

/// List mentions recorded under an entity
#[utoipa::path(
    get,
    path = "/api/v1/entities/{id}/mentions",
    tag = "entities",
    params(
        ("id" = i64, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Mentions, empty for unknown entities", body = Vec<MentionInfo>)
    )
)]
pub async fn get_entity_mentions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<EntityId>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let mentions = state.resolver.get_entity_mentions(id).await?;
    let body: Vec<MentionInfo> = mentions.into_iter().map(Into::into).collect();
    Ok(Json(body))
}
