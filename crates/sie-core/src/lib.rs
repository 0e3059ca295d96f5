//! SIE Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the SIE system:
//! - Entity graph models (entities, mentions, relationships)
//! - Closed type sets for entity and relationship kinds
//! - Common error types
//! - The confidence reconciliation policy shared by both store reconcilers
//! - Store traits with in-memory and PostgreSQL implementations
//! - Configuration management

pub mod config;
pub mod memory;
pub mod policy;
pub mod postgres;
pub mod store;

pub use config::{
    AppConfig, ConfigError, DatabaseConfig, DiscoveryConfig, LoggingConfig, ServerConfig,
    StoreKind,
};
pub use memory::MemoryStore;
pub use policy::{reconcile, Evidence};
pub use postgres::PgStore;
pub use store::{KnowledgeStore, Page, StoreTransaction};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for SIE operations
#[derive(Error, Debug)]
pub enum SieError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SieError>;

/// Row identifier assigned by the store
pub type EntityId = i64;

// ============================================================================
// Entity Types
// ============================================================================

/// Heuristic entity classification
///
/// `Unknown` and `Other` are the fallbacks: `Other` is what the candidate
/// extractor assigns to capitalized phrases, `Unknown` is what the
/// relationship reconciler assigns when no heuristic fires and what any
/// unrecognized stored value maps back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Company,
    Product,
    Unknown,
    Other,
}

impl EntityType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Company => "company",
            Self::Product => "product",
            Self::Unknown => "unknown",
            Self::Other => "other",
        }
    }

    /// Parse a known type name (case-insensitive)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "person" => Some(Self::Person),
            "company" => Some(Self::Company),
            "product" => Some(Self::Product),
            "unknown" => Some(Self::Unknown),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Parse a type name, falling back to `Unknown`
    pub fn from_name_lossy(s: &str) -> Self {
        Self::from_name(s).unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Relationship Types
// ============================================================================

/// Closed set of directed edge kinds between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipType {
    Founder,
    Ceo,
    Employee,
    Investor,
    Competitor,
    ParentCompany,
    Subsidiary,
    Partner,
    AcquiredBy,
    BoardMember,
    Advisor,
    AlumniOf,
    Affiliation,
    Opponent,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 14] = [
        Self::Founder,
        Self::Ceo,
        Self::Employee,
        Self::Investor,
        Self::Competitor,
        Self::ParentCompany,
        Self::Subsidiary,
        Self::Partner,
        Self::AcquiredBy,
        Self::BoardMember,
        Self::Advisor,
        Self::AlumniOf,
        Self::Affiliation,
        Self::Opponent,
    ];

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Founder => "founder",
            Self::Ceo => "ceo",
            Self::Employee => "employee",
            Self::Investor => "investor",
            Self::Competitor => "competitor",
            Self::ParentCompany => "parentCompany",
            Self::Subsidiary => "subsidiary",
            Self::Partner => "partner",
            Self::AcquiredBy => "acquiredBy",
            Self::BoardMember => "boardMember",
            Self::Advisor => "advisor",
            Self::AlumniOf => "alumniOf",
            Self::Affiliation => "affiliation",
            Self::Opponent => "opponent",
        }
    }

    /// Get from string
    pub fn from_name(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().to_lowercase() == lower)
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Entity Graph Models
// ============================================================================

/// A canonical entity, unique by `(canonical_name, entity_type)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub canonical_name: String,
    pub entity_type: EntityType,
    /// Never decreases once stored
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

/// A surface form observed for an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    pub id: EntityId,
    pub entity_id: EntityId,
    pub mention_text: String,
    /// Originating text span
    pub context: String,
    pub source_url: Option<String>,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Directed, typed edge between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: EntityId,
    pub subject_entity_id: EntityId,
    pub object_entity_id: EntityId,
    pub relationship_type: RelationshipType,
    pub confidence_score: f64,
    /// Sentence the edge was first extracted from
    pub source_text: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an entity
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub canonical_name: String,
    pub entity_type: EntityType,
    pub confidence_score: f64,
}

/// Insert payload for a mention
#[derive(Debug, Clone)]
pub struct NewMention {
    pub entity_id: EntityId,
    pub mention_text: String,
    pub context: String,
    pub source_url: Option<String>,
    pub confidence_score: f64,
}

/// Insert payload for a relationship
#[derive(Debug, Clone)]
pub struct NewRelationship {
    pub subject_entity_id: EntityId,
    pub object_entity_id: EntityId,
    pub relationship_type: RelationshipType,
    pub confidence_score: f64,
    pub source_text: String,
}

// ============================================================================
// Tests
// ============================================================================
