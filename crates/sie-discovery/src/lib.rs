//! SIE Discovery - Community discovery for a company
//!
//! Finds public communities matching a company's domain, samples their
//! recent posts and ranks them by estimated business value.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sie_core::{DiscoveryConfig, Result, SieError};

pub mod reddit;
pub mod scoring;

pub use reddit::RedditClient;
pub use scoring::{rank_communities, score_community, RankLimits, ScoredCommunity};

// ============================================================================
// Source types
// ============================================================================

/// A community as returned by the search read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityInfo {
    pub name: String,
    pub subscribers: i64,
    pub description: String,
    pub title: String,
}

/// A recent post of a community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub score: i64,
    pub num_comments: i64,
    pub permalink: String,
    pub created_utc: f64,
}

/// Remote source of communities and their posts
#[async_trait]
pub trait CommunitySource: Send + Sync {
    /// Communities matching `query`, in the source's relevance order
    async fn search_communities(&self, query: &str, limit: usize) -> Result<Vec<CommunityInfo>>;

    /// Up to `limit` of the newest posts of `community`
    async fn recent_posts(&self, community: &str, limit: usize) -> Result<Vec<Post>>;
}

// ============================================================================
// Discovery workflow
// ============================================================================

/// Company token of a domain: `"https://www.OpenAI.com"` becomes `"openai"`
pub fn extract_company_name(domain: &str) -> String {
    let domain = domain.replace("https://", "").replace("http://", "");
    let domain = domain.replace("www.", "");
    domain
        .split('.')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Ranks the communities of a company by business value
pub struct CommunityDiscovery {
    source: Arc<dyn CommunitySource>,
    config: DiscoveryConfig,
}

impl CommunityDiscovery {
    pub fn new(source: Arc<dyn CommunitySource>, config: DiscoveryConfig) -> Self {
        Self { source, config }
    }

    /// Discover, score and rank communities for `company_domain`
    ///
    /// A failed community search fails the whole call. A failed post fetch
    /// only empties that community's post list.
    pub async fn discover_communities(&self, company_domain: &str) -> Result<Vec<ScoredCommunity>> {
        let company = extract_company_name(company_domain);
        if company.is_empty() {
            return Err(SieError::Validation(format!(
                "no company name in domain '{company_domain}'"
            )));
        }

        let communities = self
            .source
            .search_communities(&company, self.config.search_limit)
            .await?;
        debug!(company = %company, found = communities.len(), "searched communities");

        // buffered() yields in input order, so ties keep the search order
        let names: Vec<String> = communities.iter().map(|c| c.name.clone()).collect();
        let posts: Vec<Vec<Post>> = stream::iter(names)
            .map(|name| async move { self.fetch_posts(&name).await })
            .buffered(self.config.fetch_concurrency.max(1))
            .collect()
            .await;

        let scored: Vec<ScoredCommunity> = communities
            .into_iter()
            .zip(posts)
            .map(|(community, posts)| score_community(community, posts, &company))
            .collect();

        let ranked = rank_communities(
            scored,
            RankLimits {
                max_results: self.config.max_results,
                sample_post_communities: self.config.sample_post_communities,
                sample_posts: self.config.sample_posts,
            },
        );

        info!(company = %company, results = ranked.len(), "discovered communities");
        Ok(ranked)
    }

    async fn fetch_posts(&self, community: &str) -> Vec<Post> {
        match self
            .source
            .recent_posts(community, self.config.posts_per_community)
            .await
        {
            Ok(mut posts) => {
                for post in &mut posts {
                    truncate_chars(&mut post.selftext, self.config.selftext_limit);
                }
                posts
            }
            Err(e) => {
                warn!(community, error = %e, "post fetch failed, scoring without posts");
                Vec::new()
            }
        }
    }
}

fn truncate_chars(text: &mut String, max: usize) {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
}
