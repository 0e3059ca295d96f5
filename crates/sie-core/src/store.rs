//! Store traits
//!
//! The core owns the reconciliation policy, not the persistence mechanism.
//! Reconcilers write through a [`StoreTransaction`] so that every insert and
//! update of one workflow is committed as a single unit; read paths go
//! straight to the [`KnowledgeStore`].

use async_trait::async_trait;

use crate::{
    Entity, EntityId, EntityMention, EntityType, NewEntity, NewMention, NewRelationship,
    Relationship, RelationshipType, Result,
};

/// Offset pagination for list reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
        }
    }
}

/// Read access to the entity graph plus a way to start a write unit
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Start a transaction-scoped unit of writes
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// List entities ordered by id, optionally filtered by type
    async fn list_entities(
        &self,
        page: Page,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<Entity>>;

    /// Get entity by ID
    async fn get_entity(&self, id: EntityId) -> Result<Option<Entity>>;

    /// Case-insensitive substring search on canonical names
    async fn search_entities(&self, query: &str, limit: usize) -> Result<Vec<Entity>>;

    /// Mentions recorded under an entity
    async fn get_entity_mentions(&self, entity_id: EntityId) -> Result<Vec<EntityMention>>;

    /// List relationships ordered by id
    async fn list_relationships(&self, page: Page) -> Result<Vec<Relationship>>;

    /// Relationships where the entity is subject or object
    async fn get_entity_relationships(&self, entity_id: EntityId) -> Result<Vec<Relationship>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Pending writes of one workflow invocation
///
/// Dropping a transaction without calling [`StoreTransaction::commit`]
/// discards everything written through it.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Exact match on `(canonical_name, entity_type)`
    async fn find_entity(
        &mut self,
        canonical_name: &str,
        entity_type: EntityType,
    ) -> Result<Option<Entity>>;

    /// Case-insensitive exact match on canonical name, any type
    async fn find_entity_by_name(&mut self, name: &str) -> Result<Option<Entity>>;

    async fn insert_entity(&mut self, entity: NewEntity) -> Result<Entity>;

    async fn update_entity_confidence(&mut self, id: EntityId, confidence: f64) -> Result<()>;

    /// Exact match on `(entity_id, mention_text)`
    async fn find_mention(
        &mut self,
        entity_id: EntityId,
        mention_text: &str,
    ) -> Result<Option<EntityMention>>;

    async fn insert_mention(&mut self, mention: NewMention) -> Result<EntityMention>;

    /// Exact match on the `(subject, object, type)` triple
    async fn find_relationship(
        &mut self,
        subject_entity_id: EntityId,
        object_entity_id: EntityId,
        relationship_type: RelationshipType,
    ) -> Result<Option<Relationship>>;

    async fn insert_relationship(&mut self, relationship: NewRelationship)
        -> Result<Relationship>;

    async fn update_relationship(
        &mut self,
        id: EntityId,
        confidence: f64,
        source_text: &str,
    ) -> Result<()>;

    /// Make every write of this unit visible at once
    async fn commit(self: Box<Self>) -> Result<()>;
}
