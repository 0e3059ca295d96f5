//! In-memory store
//!
//! Backs tests and the CLI default. A transaction holds the table lock for
//! its whole lifetime and works on a copy of the tables, which replaces the
//! shared copy only on commit.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::store::{KnowledgeStore, Page, StoreTransaction};
use crate::{
    Entity, EntityId, EntityMention, EntityType, NewEntity, NewMention, NewRelationship,
    Relationship, RelationshipType, Result, SieError,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    entities: Vec<Entity>,
    mentions: Vec<EntityMention>,
    relationships: Vec<Relationship>,
    last_entity_id: EntityId,
    last_mention_id: EntityId,
    last_relationship_id: EntityId,
}

/// Mutex-guarded in-process store
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn list_entities(
        &self,
        page: Page,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<Entity>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .entities
            .iter()
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .skip(page.skip)
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn get_entity(&self, id: EntityId) -> Result<Option<Entity>> {
        let tables = self.tables.lock().await;
        Ok(tables.entities.iter().find(|e| e.id == id).cloned())
    }

    async fn search_entities(&self, query: &str, limit: usize) -> Result<Vec<Entity>> {
        let needle = query.to_lowercase();
        let tables = self.tables.lock().await;
        Ok(tables
            .entities
            .iter()
            .filter(|e| e.canonical_name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_entity_mentions(&self, entity_id: EntityId) -> Result<Vec<EntityMention>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .mentions
            .iter()
            .filter(|m| m.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn list_relationships(&self, page: Page) -> Result<Vec<Relationship>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .relationships
            .iter()
            .skip(page.skip)
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn get_entity_relationships(&self, entity_id: EntityId) -> Result<Vec<Relationship>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .relationships
            .iter()
            .filter(|r| r.subject_entity_id == entity_id || r.object_entity_id == entity_id)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Write unit over a private copy of the tables
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_entity(
        &mut self,
        canonical_name: &str,
        entity_type: EntityType,
    ) -> Result<Option<Entity>> {
        Ok(self
            .working
            .entities
            .iter()
            .find(|e| e.canonical_name == canonical_name && e.entity_type == entity_type)
            .cloned())
    }

    async fn find_entity_by_name(&mut self, name: &str) -> Result<Option<Entity>> {
        let lower = name.to_lowercase();
        Ok(self
            .working
            .entities
            .iter()
            .find(|e| e.canonical_name.to_lowercase() == lower)
            .cloned())
    }

    async fn insert_entity(&mut self, entity: NewEntity) -> Result<Entity> {
        if self.find_entity(&entity.canonical_name, entity.entity_type).await?.is_some() {
            return Err(SieError::Database(format!(
                "duplicate entity ({}, {})",
                entity.canonical_name, entity.entity_type
            )));
        }

        self.working.last_entity_id += 1;
        let row = Entity {
            id: self.working.last_entity_id,
            canonical_name: entity.canonical_name,
            entity_type: entity.entity_type,
            confidence_score: entity.confidence_score,
            created_at: Utc::now(),
        };
        self.working.entities.push(row.clone());
        Ok(row)
    }

    async fn update_entity_confidence(&mut self, id: EntityId, confidence: f64) -> Result<()> {
        let entity = self
            .working
            .entities
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| SieError::NotFound(format!("entity {id}")))?;
        entity.confidence_score = confidence;
        Ok(())
    }

    async fn find_mention(
        &mut self,
        entity_id: EntityId,
        mention_text: &str,
    ) -> Result<Option<EntityMention>> {
        Ok(self
            .working
            .mentions
            .iter()
            .find(|m| m.entity_id == entity_id && m.mention_text == mention_text)
            .cloned())
    }

    async fn insert_mention(&mut self, mention: NewMention) -> Result<EntityMention> {
        if self
            .find_mention(mention.entity_id, &mention.mention_text)
            .await?
            .is_some()
        {
            return Err(SieError::Database(format!(
                "duplicate mention ({}, {})",
                mention.entity_id, mention.mention_text
            )));
        }

        self.working.last_mention_id += 1;
        let row = EntityMention {
            id: self.working.last_mention_id,
            entity_id: mention.entity_id,
            mention_text: mention.mention_text,
            context: mention.context,
            source_url: mention.source_url,
            confidence_score: mention.confidence_score,
            created_at: Utc::now(),
        };
        self.working.mentions.push(row.clone());
        Ok(row)
    }

    async fn find_relationship(
        &mut self,
        subject_entity_id: EntityId,
        object_entity_id: EntityId,
        relationship_type: RelationshipType,
    ) -> Result<Option<Relationship>> {
        Ok(self
            .working
            .relationships
            .iter()
            .find(|r| {
                r.subject_entity_id == subject_entity_id
                    && r.object_entity_id == object_entity_id
                    && r.relationship_type == relationship_type
            })
            .cloned())
    }

    async fn insert_relationship(
        &mut self,
        relationship: NewRelationship,
    ) -> Result<Relationship> {
        if self
            .find_relationship(
                relationship.subject_entity_id,
                relationship.object_entity_id,
                relationship.relationship_type,
            )
            .await?
            .is_some()
        {
            return Err(SieError::Database(format!(
                "duplicate relationship ({}, {}, {})",
                relationship.subject_entity_id,
                relationship.object_entity_id,
                relationship.relationship_type
            )));
        }

        self.working.last_relationship_id += 1;
        let row = Relationship {
            id: self.working.last_relationship_id,
            subject_entity_id: relationship.subject_entity_id,
            object_entity_id: relationship.object_entity_id,
            relationship_type: relationship.relationship_type,
            confidence_score: relationship.confidence_score,
            source_text: relationship.source_text,
            created_at: Utc::now(),
        };
        self.working.relationships.push(row.clone());
        Ok(row)
    }

    async fn update_relationship(
        &mut self,
        id: EntityId,
        confidence: f64,
        source_text: &str,
    ) -> Result<()> {
        let relationship = self
            .working
            .relationships
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SieError::NotFound(format!("relationship {id}")))?;
        relationship.confidence_score = confidence;
        relationship.source_text = source_text.to_string();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
