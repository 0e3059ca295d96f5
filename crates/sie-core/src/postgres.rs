//! PostgreSQL entity graph store
//!
//! Stores entities, mentions, and relationships using SQLx and PostgreSQL.
//! Uniqueness of `(canonical_name, entity_type)`, `(entity_id, mention_text)`
//! and `(subject, object, type)` is enforced by unique indexes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use tracing::info;

use crate::store::{KnowledgeStore, Page, StoreTransaction};
use crate::{
    Entity, EntityId, EntityMention, EntityType, NewEntity, NewMention, NewRelationship,
    Relationship, RelationshipType, Result, SieError,
};

const SCHEMA: [&str; 6] = [
    r#"
    CREATE TABLE IF NOT EXISTS entities (
        id BIGSERIAL PRIMARY KEY,
        canonical_name TEXT NOT NULL,
        entity_type TEXT NOT NULL DEFAULT 'unknown',
        confidence_score DOUBLE PRECISION NOT NULL DEFAULT 0.5,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_entities_name_type
        ON entities (canonical_name, entity_type)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS entity_mentions (
        id BIGSERIAL PRIMARY KEY,
        entity_id BIGINT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
        mention_text TEXT NOT NULL,
        context TEXT NOT NULL DEFAULT '',
        source_url TEXT,
        confidence_score DOUBLE PRECISION NOT NULL DEFAULT 0.5,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_mentions_entity_text
        ON entity_mentions (entity_id, mention_text)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS relationships (
        id BIGSERIAL PRIMARY KEY,
        subject_entity_id BIGINT NOT NULL REFERENCES entities(id),
        object_entity_id BIGINT NOT NULL REFERENCES entities(id),
        relationship_type TEXT NOT NULL,
        confidence_score DOUBLE PRECISION NOT NULL DEFAULT 0.5,
        source_text TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_relationships_triple
        ON relationships (subject_entity_id, object_entity_id, relationship_type)
    "#,
];

const ENTITY_COLUMNS: &str = "id, canonical_name, entity_type, confidence_score, created_at";
const MENTION_COLUMNS: &str =
    "id, entity_id, mention_text, context, source_url, confidence_score, created_at";
const RELATIONSHIP_COLUMNS: &str = "id, subject_entity_id, object_entity_id, relationship_type, confidence_score, source_text, created_at";

/// PostgreSQL entity graph store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| SieError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| SieError::Database(format!("Schema migration failed: {e}")))?;
        }
        info!(statements = SCHEMA.len(), "PostgreSQL schema ready");
        Ok(())
    }
}

/// Row counts above `i64::MAX` saturate; such an offset yields an empty page
fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// `ILIKE` pattern matching `query` as a literal substring
fn substring_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn db_err(action: &str) -> impl FnOnce(sqlx::Error) -> SieError + '_ {
    move |e| SieError::Database(format!("Failed to {action}: {e}"))
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct EntityRow {
    id: i64,
    canonical_name: String,
    entity_type: String,
    confidence_score: f64,
    created_at: DateTime<Utc>,
}

impl From<EntityRow> for Entity {
    fn from(row: EntityRow) -> Self {
        Entity {
            id: row.id,
            canonical_name: row.canonical_name,
            entity_type: EntityType::from_name_lossy(&row.entity_type),
            confidence_score: row.confidence_score,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MentionRow {
    id: i64,
    entity_id: i64,
    mention_text: String,
    context: String,
    source_url: Option<String>,
    confidence_score: f64,
    created_at: DateTime<Utc>,
}

impl From<MentionRow> for EntityMention {
    fn from(row: MentionRow) -> Self {
        EntityMention {
            id: row.id,
            entity_id: row.entity_id,
            mention_text: row.mention_text,
            context: row.context,
            source_url: row.source_url.filter(|u| !u.is_empty()),
            confidence_score: row.confidence_score,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RelationshipRow {
    id: i64,
    subject_entity_id: i64,
    object_entity_id: i64,
    relationship_type: String,
    confidence_score: f64,
    source_text: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RelationshipRow> for Relationship {
    type Error = SieError;

    fn try_from(row: RelationshipRow) -> Result<Self> {
        let relationship_type = RelationshipType::from_name(&row.relationship_type)
            .ok_or_else(|| {
                SieError::Database(format!(
                    "unknown relationship type '{}' on row {}",
                    row.relationship_type, row.id
                ))
            })?;

        Ok(Relationship {
            id: row.id,
            subject_entity_id: row.subject_entity_id,
            object_entity_id: row.object_entity_id,
            relationship_type,
            confidence_score: row.confidence_score,
            source_text: row.source_text,
            created_at: row.created_at,
        })
    }
}

fn to_relationships(rows: Vec<RelationshipRow>) -> Result<Vec<Relationship>> {
    rows.into_iter().map(Relationship::try_from).collect()
}

// ============================================================================
// Reads
// ============================================================================

#[async_trait]
impl KnowledgeStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("begin transaction"))?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn list_entities(
        &self,
        page: Page,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<Entity>> {
        let rows: Vec<EntityRow> = match entity_type {
            Some(t) => {
                sqlx::query_as(&format!(
                    "SELECT {ENTITY_COLUMNS} FROM entities WHERE entity_type = $1 \
                     ORDER BY id OFFSET $2 LIMIT $3"
                ))
                .bind(t.as_str())
                .bind(sql_count(page.skip))
                .bind(sql_count(page.limit))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {ENTITY_COLUMNS} FROM entities ORDER BY id OFFSET $1 LIMIT $2"
                ))
                .bind(sql_count(page.skip))
                .bind(sql_count(page.limit))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err("list entities"))?;

        Ok(rows.into_iter().map(Entity::from).collect())
    }

    async fn get_entity(&self, id: EntityId) -> Result<Option<Entity>> {
        let row: Option<EntityRow> = sqlx::query_as(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("get entity"))?;

        Ok(row.map(Entity::from))
    }

    async fn search_entities(&self, query: &str, limit: usize) -> Result<Vec<Entity>> {
        let rows: Vec<EntityRow> = sqlx::query_as(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities \
             WHERE canonical_name ILIKE $1 ESCAPE '\\' ORDER BY id LIMIT $2"
        ))
        .bind(substring_pattern(query))
        .bind(sql_count(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("search entities"))?;

        Ok(rows.into_iter().map(Entity::from).collect())
    }

    async fn get_entity_mentions(&self, entity_id: EntityId) -> Result<Vec<EntityMention>> {
        let rows: Vec<MentionRow> = sqlx::query_as(&format!(
            "SELECT {MENTION_COLUMNS} FROM entity_mentions WHERE entity_id = $1 ORDER BY id"
        ))
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("get entity mentions"))?;

        Ok(rows.into_iter().map(EntityMention::from).collect())
    }

    async fn list_relationships(&self, page: Page) -> Result<Vec<Relationship>> {
        let rows: Vec<RelationshipRow> = sqlx::query_as(&format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationships ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(sql_count(page.skip))
        .bind(sql_count(page.limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("list relationships"))?;

        to_relationships(rows)
    }

    async fn get_entity_relationships(&self, entity_id: EntityId) -> Result<Vec<Relationship>> {
        let rows: Vec<RelationshipRow> = sqlx::query_as(&format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationships \
             WHERE subject_entity_id = $1 OR object_entity_id = $1 ORDER BY id"
        ))
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("get entity relationships"))?;

        to_relationships(rows)
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

// ============================================================================
// Writes
// ============================================================================

/// Write unit backed by a PostgreSQL transaction
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn find_entity(
        &mut self,
        canonical_name: &str,
        entity_type: EntityType,
    ) -> Result<Option<Entity>> {
        let row: Option<EntityRow> = sqlx::query_as(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities \
             WHERE canonical_name = $1 AND entity_type = $2 LIMIT 1"
        ))
        .bind(canonical_name)
        .bind(entity_type.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err("find entity"))?;

        Ok(row.map(Entity::from))
    }

    async fn find_entity_by_name(&mut self, name: &str) -> Result<Option<Entity>> {
        let row: Option<EntityRow> = sqlx::query_as(&format!(
            "SELECT {ENTITY_COLUMNS} FROM entities \
             WHERE LOWER(canonical_name) = LOWER($1) ORDER BY id LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err("find entity by name"))?;

        Ok(row.map(Entity::from))
    }

    async fn insert_entity(&mut self, entity: NewEntity) -> Result<Entity> {
        let row: EntityRow = sqlx::query_as(&format!(
            "INSERT INTO entities (canonical_name, entity_type, confidence_score) \
             VALUES ($1, $2, $3) RETURNING {ENTITY_COLUMNS}"
        ))
        .bind(&entity.canonical_name)
        .bind(entity.entity_type.as_str())
        .bind(entity.confidence_score)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err("insert entity"))?;

        Ok(row.into())
    }

    async fn update_entity_confidence(&mut self, id: EntityId, confidence: f64) -> Result<()> {
        sqlx::query("UPDATE entities SET confidence_score = $2 WHERE id = $1")
            .bind(id)
            .bind(confidence)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err("update entity"))?;
        Ok(())
    }

    async fn find_mention(
        &mut self,
        entity_id: EntityId,
        mention_text: &str,
    ) -> Result<Option<EntityMention>> {
        let row: Option<MentionRow> = sqlx::query_as(&format!(
            "SELECT {MENTION_COLUMNS} FROM entity_mentions \
             WHERE entity_id = $1 AND mention_text = $2 LIMIT 1"
        ))
        .bind(entity_id)
        .bind(mention_text)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err("find mention"))?;

        Ok(row.map(EntityMention::from))
    }

    async fn insert_mention(&mut self, mention: NewMention) -> Result<EntityMention> {
        let row: MentionRow = sqlx::query_as(&format!(
            "INSERT INTO entity_mentions \
             (entity_id, mention_text, context, source_url, confidence_score) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {MENTION_COLUMNS}"
        ))
        .bind(mention.entity_id)
        .bind(&mention.mention_text)
        .bind(&mention.context)
        .bind(&mention.source_url)
        .bind(mention.confidence_score)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err("insert mention"))?;

        Ok(row.into())
    }

    async fn find_relationship(
        &mut self,
        subject_entity_id: EntityId,
        object_entity_id: EntityId,
        relationship_type: RelationshipType,
    ) -> Result<Option<Relationship>> {
        let row: Option<RelationshipRow> = sqlx::query_as(&format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationships \
             WHERE subject_entity_id = $1 AND object_entity_id = $2 \
             AND relationship_type = $3 LIMIT 1"
        ))
        .bind(subject_entity_id)
        .bind(object_entity_id)
        .bind(relationship_type.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err("find relationship"))?;

        row.map(Relationship::try_from).transpose()
    }

    async fn insert_relationship(
        &mut self,
        relationship: NewRelationship,
    ) -> Result<Relationship> {
        let row: RelationshipRow = sqlx::query_as(&format!(
            "INSERT INTO relationships \
             (subject_entity_id, object_entity_id, relationship_type, confidence_score, source_text) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {RELATIONSHIP_COLUMNS}"
        ))
        .bind(relationship.subject_entity_id)
        .bind(relationship.object_entity_id)
        .bind(relationship.relationship_type.as_str())
        .bind(relationship.confidence_score)
        .bind(&relationship.source_text)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err("insert relationship"))?;

        row.try_into()
    }

    async fn update_relationship(
        &mut self,
        id: EntityId,
        confidence: f64,
        source_text: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE relationships SET confidence_score = $2, source_text = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(confidence)
        .bind(source_text)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err("update relationship"))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(db_err("commit transaction"))
    }
}
