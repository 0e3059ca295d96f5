//! Community scoring
//!
//! Pure functions from a community and its fetched posts to sub-scores and
//! the combined business value. Nothing here touches the network.

use serde::{Deserialize, Serialize};

use crate::{CommunityInfo, Post};

/// Subscriber count at which the audience score saturates
pub const AUDIENCE_SATURATION: f64 = 10_000_000.0;

/// Average comment count that maps to a full comment score
pub const COMMENTS_SATURATION: f64 = 100.0;

/// Average post score that maps to a full post score
pub const POST_SCORE_SATURATION: f64 = 500.0;

/// Multiplier for communities where no fetched post mentions the company
pub const ZERO_MENTION_PENALTY: f64 = 0.75;

// ============================================================================
// Sub-scores
// ============================================================================

/// Where the company token shows up: name, title, description, or nowhere
pub fn relevance_score(name: &str, title: &str, description: &str, company: &str) -> f64 {
    let company = company.to_lowercase();

    if name.to_lowercase().contains(&company) {
        1.0
    } else if title.to_lowercase().contains(&company) {
        0.8
    } else if description.to_lowercase().contains(&company) {
        0.6
    } else {
        0.2
    }
}

/// Log-scaled subscriber count, saturating at [`AUDIENCE_SATURATION`]
pub fn audience_score(subscribers: i64) -> f64 {
    if subscribers <= 0 {
        return 0.0;
    }
    let ratio = (subscribers as f64 + 1.0).ln() / (AUDIENCE_SATURATION + 1.0).ln();
    ratio.min(1.0)
}

/// Posts whose title or body contains the company token, ignoring case
pub fn count_mentions(posts: &[Post], company: &str) -> usize {
    let company = company.to_lowercase();
    posts
        .iter()
        .filter(|p| {
            format!("{} {}", p.title, p.selftext)
                .to_lowercase()
                .contains(&company)
        })
        .count()
}

pub fn mention_ratio(mention_count: usize, post_count: usize) -> f64 {
    mention_count as f64 / post_count.max(1) as f64
}

/// Weighted blend of average comments and average score; 0 with no posts
pub fn engagement_score(posts: &[Post]) -> f64 {
    if posts.is_empty() {
        return 0.0;
    }

    let n = posts.len() as f64;
    let avg_comments = posts.iter().map(|p| p.num_comments as f64).sum::<f64>() / n;
    let avg_score = posts.iter().map(|p| p.score as f64).sum::<f64>() / n;

    let comments = (avg_comments / COMMENTS_SATURATION).min(1.0);
    let score = (avg_score / POST_SCORE_SATURATION).min(1.0);
    0.6 * comments + 0.4 * score
}

/// Combined score in `[0, 1]`
pub fn business_value(
    relevance: f64,
    audience: f64,
    engagement: f64,
    mention_ratio: f64,
    mention_count: usize,
) -> f64 {
    let mut score =
        (0.50 * relevance + 0.15 * audience + 0.15 * engagement + 0.20 * mention_ratio)
            .clamp(0.0, 1.0);
    if mention_count == 0 {
        score *= ZERO_MENTION_PENALTY;
    }
    score
}

// ============================================================================
// Scored communities
// ============================================================================

/// A community with every sub-score attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCommunity {
    pub name: String,
    pub subscribers: i64,
    pub description: String,
    pub title: String,
    pub relevance_score: f64,
    pub audience_score: f64,
    pub engagement_score: f64,
    pub mention_count: usize,
    pub mention_ratio: f64,
    pub business_value_score: f64,
    /// Fetched posts until ranking trims them
    pub sample_posts: Vec<Post>,
}

/// Score one community against the company token
pub fn score_community(community: CommunityInfo, posts: Vec<Post>, company: &str) -> ScoredCommunity {
    let relevance = relevance_score(
        &community.name,
        &community.title,
        &community.description,
        company,
    );
    let audience = audience_score(community.subscribers);
    let mention_count = count_mentions(&posts, company);
    let ratio = mention_ratio(mention_count, posts.len());
    let engagement = engagement_score(&posts);

    ScoredCommunity {
        business_value_score: business_value(relevance, audience, engagement, ratio, mention_count),
        name: community.name,
        subscribers: community.subscribers,
        description: community.description,
        title: community.title,
        relevance_score: relevance,
        audience_score: audience,
        engagement_score: engagement,
        mention_count,
        mention_ratio: ratio,
        sample_posts: posts,
    }
}

/// How much of the ranking survives into the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankLimits {
    pub max_results: usize,
    pub sample_post_communities: usize,
    pub sample_posts: usize,
}

impl Default for RankLimits {
    fn default() -> Self {
        Self {
            max_results: 20,
            sample_post_communities: 5,
            sample_posts: 10,
        }
    }
}

/// Sort by business value, descending and stable, then truncate
///
/// Only the leading `sample_post_communities` keep sample posts.
pub fn rank_communities(
    mut scored: Vec<ScoredCommunity>,
    limits: RankLimits,
) -> Vec<ScoredCommunity> {
    scored.sort_by(|a, b| b.business_value_score.total_cmp(&a.business_value_score));
    scored.truncate(limits.max_results);

    for (i, community) in scored.iter_mut().enumerate() {
        if i < limits.sample_post_communities {
            community.sample_posts.truncate(limits.sample_posts);
        } else {
            community.sample_posts.clear();
        }
    }
    scored
}
