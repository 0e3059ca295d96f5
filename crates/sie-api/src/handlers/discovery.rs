//! Community discovery handlers
//!
//! Author: hephaex@gmail.com

use crate::error::{ApiError, AppError};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use sie_discovery::{Post, ScoredCommunity};
use std::sync::Arc;
use utoipa::ToSchema;

/// Company whose communities should be found
#[derive(Debug, Deserialize, ToSchema)]
pub struct DiscoveryRequest {
    #[serde(default)]
    #[schema(example = "https://www.openai.com")]
    pub company_domain: String,
}

/// Recent post kept as a sample
#[derive(Debug, Serialize, ToSchema)]
pub struct PostInfo {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub score: i64,
    pub num_comments: i64,
    pub permalink: String,
    pub created_utc: f64,
}

impl From<Post> for PostInfo {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            selftext: post.selftext,
            score: post.score,
            num_comments: post.num_comments,
            permalink: post.permalink,
            created_utc: post.created_utc,
        }
    }
}

/// Community with its scores
#[derive(Debug, Serialize, ToSchema)]
pub struct CommunityInfo {
    #[schema(example = "OpenAI")]
    pub name: String,
    pub subscribers: i64,
    pub description: String,
    pub title: String,
    pub relevance_score: f64,
    pub audience_score: f64,
    pub engagement_score: f64,
    pub mention_count: usize,
    pub mention_ratio: f64,
    /// Combined score in [0, 1]
    pub business_value_score: f64,
    pub sample_posts: Vec<PostInfo>,
}

impl From<ScoredCommunity> for CommunityInfo {
    fn from(c: ScoredCommunity) -> Self {
        Self {
            name: c.name,
            subscribers: c.subscribers,
            description: c.description,
            title: c.title,
            relevance_score: c.relevance_score,
            audience_score: c.audience_score,
            engagement_score: c.engagement_score,
            mention_count: c.mention_count,
            mention_ratio: c.mention_ratio,
            business_value_score: c.business_value_score,
            sample_posts: c.sample_posts.into_iter().map(Into::into).collect(),
        }
    }
}

/// Discover and rank communities for a company
#[utoipa::path(
    post,
    path = "/api/v1/discovery/communities",
    tag = "discovery",
    request_body = DiscoveryRequest,
    responses(
        (status = 200, description = "Communities ranked by business value", body = Vec<CommunityInfo>),
        (status = 400, description = "No company name in the domain", body = ApiError),
        (status = 502, description = "Community search failed", body = ApiError)
    )
)]
pub async fn discover_communities(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DiscoveryRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if req.company_domain.trim().is_empty() {
        return Err(AppError::BadRequest(
            "company_domain must not be empty".to_string(),
        ));
    }

    let ranked = state
        .discovery
        .discover_communities(&req.company_domain)
        .await?;
    let body: Vec<CommunityInfo> = ranked.into_iter().map(Into::into).collect();
    Ok(Json(body))
}
