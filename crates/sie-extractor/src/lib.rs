//! SIE Extractor - Entity resolution and relationship extraction pipeline
//!
//! Turns free text into canonical entities and typed edges between them:
//! - Candidate extraction (handles, capitalized phrases)
//! - Seed-anchored fuzzy merging of candidates
//! - Pattern-based relationship extraction
//! - Reconciliation of both against the entity graph store

use serde::{Deserialize, Serialize};
use sie_core::{EntityType, RelationshipType, Result};

/// Entity-like span found in raw text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCandidate {
    pub name: String,
    pub entity_type: EntityType,
    pub confidence: f64,
    /// The full source text
    pub context: String,
}

/// One raw surface form folded into a merged candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMention {
    pub text: String,
    pub context: String,
    pub confidence: f64,
}

/// A group of candidates judged to name the same entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedCandidate {
    pub canonical_name: String,
    pub entity_type: EntityType,
    pub confidence: f64,
    pub mentions: Vec<CandidateMention>,
}

/// Proposed subject-predicate-object fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelation {
    pub subject: String,
    pub object: String,
    pub relationship_type: RelationshipType,
    pub confidence: f64,
    pub source_sentence: String,
}

/// Trait for entity candidate extractors
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedCandidate>>;
}

/// Trait for relation extractors
pub trait RelationExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedRelation>>;
}

pub mod inference;
pub mod merge;
pub mod ner;
pub mod normalize;
pub mod relation;
pub mod resolver;

pub use inference::{guess_entity_type, RelationshipInference, StoredRelationship};
pub use merge::{merge_similar, similarity, SimilarityMerger};
pub use ner::CandidateExtractor;
pub use normalize::normalize;
pub use relation::{RelationPattern, RuleBasedRe};
pub use resolver::{EntityResolver, ResolvedEntity};
