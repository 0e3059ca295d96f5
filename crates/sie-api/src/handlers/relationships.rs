//! Relationship extraction handlers
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
use sie_core::{EntityId, Page, Relationship};
use sie_extractor::StoredRelationship;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use super::{default_limit, MAX_LIMIT};

/// Free text to mine for relationships
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtractRequest {
    #[serde(default)]
    #[schema(example = "Sam Altman is the CEO of OpenAI. Microsoft invested in OpenAI.")]
    pub text: String,
}

/// Relationship stored by an extraction call
#[derive(Debug, Serialize, ToSchema)]
pub struct ExtractedRelationshipInfo {
    pub id: EntityId,
    /// Subject as written in the text
    pub subject: String,
    pub subject_entity_id: EntityId,
    #[schema(example = "ceo")]
    pub relationship: String,
    /// Object as written in the text
    pub object: String,
    pub object_entity_id: EntityId,
    pub confidence: f64,
    pub source_text: String,
}

impl From<StoredRelationship> for ExtractedRelationshipInfo {
    fn from(rel: StoredRelationship) -> Self {
        Self {
            id: rel.id,
            subject: rel.subject,
            subject_entity_id: rel.subject_entity_id,
            relationship: rel.relationship_type.to_string(),
            object: rel.object,
            object_entity_id: rel.object_entity_id,
            confidence: rel.confidence,
            source_text: rel.source_text,
        }
    }
}

/// Stored relationship row
#[derive(Debug, Serialize, ToSchema)]
pub struct RelationshipInfo {
    pub id: EntityId,
    pub subject_entity_id: EntityId,
    pub object_entity_id: EntityId,
    #[schema(example = "investor")]
    pub relationship_type: String,
    pub confidence_score: f64,
    pub source_text: String,
    pub created_at: String,
}

impl From<Relationship> for RelationshipInfo {
    fn from(rel: Relationship) -> Self {
        Self {
            id: rel.id,
            subject_entity_id: rel.subject_entity_id,
            object_entity_id: rel.object_entity_id,
            relationship_type: rel.relationship_type.to_string(),
            confidence_score: rel.confidence_score,
            source_text: rel.source_text,
            created_at: rel.created_at.to_rfc3339(),
        }
    }
}

/// Query parameters for relationship listing
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRelationshipsQuery {
    /// Rows to skip
    #[serde(default)]
    pub skip: usize,

    /// Limit results
    #[serde(default = "default_limit")]
    #[param(default = 100)]
    pub limit: usize,
}

/// Extract relationships from free text and store them
#[utoipa::path(
    post,
    path = "/api/v1/relationships/extract",
    tag = "relationships",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Stored relationships", body = Vec<ExtractedRelationshipInfo>),
        (status = 400, description = "Empty text", body = ApiError)
    )
)]
pub async fn extract_relationships(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }

    let stored = state
        .inference
        .extract_relationships_from_text(&req.text)
        .await?;
    let body: Vec<ExtractedRelationshipInfo> = stored.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

/// List relationships
#[utoipa::path(
    get,
    path = "/api/v1/relationships",
    tag = "relationships",
    params(ListRelationshipsQuery),
    responses(
        (status = 200, description = "Relationship list", body = Vec<RelationshipInfo>)
    )
)]
pub async fn list_relationships(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListRelationshipsQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let page = Page::new(params.skip, params.limit.min(MAX_LIMIT));
    let relationships = state.inference.list_relationships(page).await?;
    let body: Vec<RelationshipInfo> = relationships.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

/// Relationships where the entity is subject or object
#[utoipa::path(
    get,
    path = "/api/v1/entities/{id}/relationships",
    tag = "relationships",
    params(
        ("id" = i64, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Relationships, empty for unknown entities", body = Vec<RelationshipInfo>)
    )
)]
pub async fn get_entity_relationships(
    State(state): State<Arc<AppState>>,
    Path(id): Path<EntityId>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let relationships = state.inference.get_entity_relationships(id).await?;
    let body: Vec<RelationshipInfo> = relationships.into_iter().map(Into::into).collect();
    Ok(Json(body))
}
