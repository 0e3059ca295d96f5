//! Public Reddit JSON client
//!
//! Unauthenticated reads of the public listing endpoints. Every request
//! carries a fixed User-Agent and a per-request timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::{CommunityInfo, CommunitySource, Post};
use sie_core::{DiscoveryConfig, Result, SieError};

const PERMALINK_HOST: &str = "https://reddit.com";

// ============================================================================
// Listing payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct Listing<T> {
    #[serde(default = "ListingData::empty")]
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    #[serde(default = "Vec::new")]
    children: Vec<Child<T>>,
}

impl<T> ListingData<T> {
    fn empty() -> Self {
        Self {
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Child<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubredditData {
    display_name: Option<String>,
    subscribers: Option<f64>,
    public_description: Option<String>,
    title: Option<String>,
}

impl From<SubredditData> for CommunityInfo {
    fn from(data: SubredditData) -> Self {
        Self {
            name: data.display_name.unwrap_or_default(),
            subscribers: data.subscribers.unwrap_or(0.0) as i64,
            description: data.public_description.unwrap_or_default(),
            title: data.title.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostData {
    id: Option<String>,
    title: Option<String>,
    selftext: Option<String>,
    score: Option<f64>,
    num_comments: Option<f64>,
    permalink: Option<String>,
    created_utc: Option<f64>,
}

impl From<PostData> for Post {
    fn from(data: PostData) -> Self {
        Self {
            id: data.id.unwrap_or_default(),
            title: data.title.unwrap_or_default(),
            selftext: data.selftext.unwrap_or_default(),
            score: data.score.unwrap_or(0.0) as i64,
            num_comments: data.num_comments.unwrap_or(0.0) as i64,
            permalink: format!(
                "{PERMALINK_HOST}{}",
                data.permalink.unwrap_or_default()
            ),
            created_utc: data.created_utc.unwrap_or(0.0),
        }
    }
}

fn children<T, U: From<T>>(listing: Listing<T>) -> Vec<U> {
    listing
        .data
        .children
        .into_iter()
        .map(|child| U::from(child.data))
        .collect()
}

// ============================================================================
// Client
// ============================================================================

/// Reddit community source
pub struct RedditClient {
    client: Client,
    base_url: String,
}

impl RedditClient {
    /// Create a client from discovery config
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SieError::Fetch(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.reddit_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_listing<T>(&self, url: &str, query: &[(&str, String)]) -> Result<Listing<T>>
    where
        T: DeserializeOwned + Send,
    {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| SieError::Fetch(format!("Request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SieError::Fetch(format!("{url} returned {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| SieError::Fetch(format!("Failed to parse {url}: {e}")))
    }
}

#[async_trait]
impl CommunitySource for RedditClient {
    async fn search_communities(&self, query: &str, limit: usize) -> Result<Vec<CommunityInfo>> {
        let url = format!("{}/subreddits/search.json", self.base_url);
        let listing: Listing<SubredditData> = self
            .get_listing(&url, &[("q", query.to_string()), ("limit", limit.to_string())])
            .await?;

        let communities: Vec<CommunityInfo> = children(listing);
        debug!(query, count = communities.len(), "fetched community search");
        Ok(communities)
    }

    async fn recent_posts(&self, community: &str, limit: usize) -> Result<Vec<Post>> {
        let url = format!("{}/r/{}/new.json", self.base_url, community);
        let listing: Listing<PostData> = self
            .get_listing(&url, &[("limit", limit.to_string())])
            .await?;

        Ok(children(listing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_listing() {
        let json = r#"{
            "kind": "Listing",
            "data": {
                "children": [
                    {"kind": "t5", "data": {
                        "display_name": "OpenAI",
                        "subscribers": 1500000,
                        "public_description": "News about OpenAI",
                        "title": "OpenAI"
                    }},
                    {"kind": "t5", "data": {
                        "display_name": "quiet",
                        "subscribers": null,
                        "public_description": null
                    }}
                ]
            }
        }"#;

        let listing: Listing<SubredditData> = serde_json::from_str(json).unwrap();
        let communities: Vec<CommunityInfo> = children(listing);

        assert_eq!(communities.len(), 2);
        assert_eq!(communities[0].name, "OpenAI");
        assert_eq!(communities[0].subscribers, 1_500_000);
        assert_eq!(communities[1].subscribers, 0);
        assert_eq!(communities[1].description, "");
        assert_eq!(communities[1].title, "");
    }

    #[test]
    fn test_parse_post_listing() {
        let json = r#"{
            "data": {
                "children": [
                    {"data": {
                        "id": "abc123",
                        "title": "GPT news",
                        "selftext": "",
                        "score": 42,
                        "num_comments": 7,
                        "permalink": "/r/OpenAI/comments/abc123/gpt_news/",
                        "created_utc": 1700000000.0
                    }},
                    {"data": {"title": null}}
                ]
            }
        }"#;

        let listing: Listing<PostData> = serde_json::from_str(json).unwrap();
        let posts: Vec<Post> = children(listing);

        assert_eq!(posts[0].id, "abc123");
        assert_eq!(posts[0].score, 42);
        assert_eq!(posts[0].num_comments, 7);
        assert_eq!(
            posts[0].permalink,
            "https://reddit.com/r/OpenAI/comments/abc123/gpt_news/"
        );
        assert_eq!(posts[1].title, "");
        assert_eq!(posts[1].score, 0);
        assert_eq!(posts[1].created_utc, 0.0);
    }

    #[test]
    fn test_missing_data_is_empty() {
        let listing: Listing<PostData> = serde_json::from_str(r#"{"kind": "Listing"}"#).unwrap();
        assert!(children::<PostData, Post>(listing).is_empty());
    }

    #[test]
    fn test_client_trims_base_url() {
        let config = DiscoveryConfig {
            reddit_base_url: "http://localhost:9999/".to_string(),
            ..Default::default()
        };
        let client = RedditClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
