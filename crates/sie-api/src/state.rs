//! Application state management
//!
//! Author: hephaex@gmail.com

use sie_core::{AppConfig, KnowledgeStore};
use sie_discovery::{CommunityDiscovery, CommunitySource};
use sie_extractor::{EntityResolver, RelationshipInference};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Entity resolution workflow
    pub resolver: EntityResolver,
    /// Relationship extraction workflow
    pub inference: RelationshipInference,
    /// Community discovery workflow
    pub discovery: CommunityDiscovery,
    store_name: String,
}

impl AppState {
    /// Wire the workflows to one store and one community source
    pub fn new(
        config: AppConfig,
        store: Arc<dyn KnowledgeStore>,
        source: Arc<dyn CommunitySource>,
    ) -> Self {
        let discovery = CommunityDiscovery::new(source, config.discovery.clone());
        Self {
            store_name: store.name().to_string(),
            resolver: EntityResolver::new(store.clone()),
            inference: RelationshipInference::new(store),
            discovery,
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Backend name of the entity store
    pub fn store_name(&self) -> &str {
        &self.store_name
    }
}
