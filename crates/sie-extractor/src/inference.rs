//! Relationship inference workflow
//!
//! Runs the pattern extractor over free text, resolves both ends of every
//! fact to an entity (creating one with a guessed type when absent) and
//! upserts the edge on its `(subject, object, type)` key.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::relation::RuleBasedRe;
use crate::{ExtractedRelation, RelationExtractor};
use sie_core::{
    reconcile, Entity, EntityId, EntityType, Evidence, KnowledgeStore, NewEntity,
    NewRelationship, Page, Relationship, RelationshipType, Result, StoreTransaction,
};

/// Confidence of entities created while storing a relationship
pub const INFERRED_ENTITY_CONFIDENCE: f64 = 0.6;

const COMPANY_KEYWORDS: [&str; 6] = ["inc", "corp", "ltd", "llc", "company", "technologies"];

/// Heuristic type for a name seen only as a relationship endpoint
///
/// Keyword matching is by substring, so "Lincoln" counts as a company.
pub fn guess_entity_type(name: &str) -> EntityType {
    let lower = name.to_lowercase();
    if COMPANY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return EntityType::Company;
    }

    match name.split_whitespace().count() {
        2 | 3 => EntityType::Person,
        _ => EntityType::Unknown,
    }
}

/// A stored edge as reported back to the caller
///
/// `subject` and `object` are the names as extracted from the text, which
/// may differ in case from the canonical names they resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRelationship {
    pub id: EntityId,
    pub subject: String,
    pub subject_entity_id: EntityId,
    #[serde(rename = "relationship")]
    pub relationship_type: RelationshipType,
    pub object: String,
    pub object_entity_id: EntityId,
    pub confidence: f64,
    pub source_text: String,
}

/// Extracts and stores relationships between entities
pub struct RelationshipInference {
    store: Arc<dyn KnowledgeStore>,
    extractor: Box<dyn RelationExtractor>,
}

impl RelationshipInference {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self {
            store,
            extractor: Box::new(RuleBasedRe::new()),
        }
    }

    /// Replace the relation extractor
    pub fn with_extractor(mut self, extractor: impl RelationExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Extract facts from `text` and upsert them in one transaction
    pub async fn extract_relationships_from_text(
        &self,
        text: &str,
    ) -> Result<Vec<StoredRelationship>> {
        let facts = self.extractor.extract(text)?;
        if facts.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.store.begin().await?;
        let mut stored = Vec::with_capacity(facts.len());
        for fact in &facts {
            stored.push(store_fact(tx.as_mut(), fact).await?);
        }
        tx.commit().await?;

        info!(
            store = self.store.name(),
            facts = facts.len(),
            "stored relationships"
        );
        Ok(stored)
    }

    /// List relationships ordered by id
    pub async fn list_relationships(&self, page: Page) -> Result<Vec<Relationship>> {
        self.store.list_relationships(page).await
    }

    /// Edges where the entity is subject or object
    pub async fn get_entity_relationships(&self, entity_id: EntityId) -> Result<Vec<Relationship>> {
        self.store.get_entity_relationships(entity_id).await
    }
}

async fn find_or_create_entity(tx: &mut dyn StoreTransaction, name: &str) -> Result<Entity> {
    if let Some(entity) = tx.find_entity_by_name(name).await? {
        return Ok(entity);
    }

    tx.insert_entity(NewEntity {
        canonical_name: name.to_string(),
        entity_type: guess_entity_type(name),
        confidence_score: INFERRED_ENTITY_CONFIDENCE,
    })
    .await
}

async fn store_fact(
    tx: &mut dyn StoreTransaction,
    fact: &ExtractedRelation,
) -> Result<StoredRelationship> {
    let subject = find_or_create_entity(tx, &fact.subject).await?;
    let object = find_or_create_entity(tx, &fact.object).await?;

    let existing = tx
        .find_relationship(subject.id, object.id, fact.relationship_type)
        .await?;

    let (id, confidence, source_text) = match existing {
        Some(existing) => {
            let merged = reconcile(
                &Evidence::confidence(existing.confidence_score)
                    .with_source_text(existing.source_text.clone()),
                &Evidence::confidence(fact.confidence)
                    .with_source_text(fact.source_sentence.clone()),
            );
            let source_text = merged.source_text.unwrap_or_default();
            if merged.confidence != existing.confidence_score
                || source_text != existing.source_text
            {
                tx.update_relationship(existing.id, merged.confidence, &source_text)
                    .await?;
            }
            (existing.id, merged.confidence, source_text)
        }
        None => {
            let row = tx
                .insert_relationship(NewRelationship {
                    subject_entity_id: subject.id,
                    object_entity_id: object.id,
                    relationship_type: fact.relationship_type,
                    confidence_score: fact.confidence,
                    source_text: fact.source_sentence.clone(),
                })
                .await?;
            (row.id, row.confidence_score, row.source_text)
        }
    };

    debug!(
        relationship_id = id,
        subject = %fact.subject,
        object = %fact.object,
        kind = %fact.relationship_type,
        "stored relationship"
    );

    Ok(StoredRelationship {
        id,
        subject: fact.subject.clone(),
        subject_entity_id: subject.id,
        relationship_type: fact.relationship_type,
        object: fact.object.clone(),
        object_entity_id: object.id,
        confidence,
        source_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sie_core::MemoryStore;

    /// Emits a fixed fact list regardless of input
    struct FixedRelations(Vec<ExtractedRelation>);

    impl RelationExtractor for FixedRelations {
        fn extract(&self, _text: &str) -> Result<Vec<ExtractedRelation>> {
            Ok(self.0.clone())
        }
    }

    fn fact(subject: &str, object: &str, confidence: f64, sentence: &str) -> ExtractedRelation {
        ExtractedRelation {
            subject: subject.to_string(),
            object: object.to_string(),
            relationship_type: RelationshipType::Investor,
            confidence,
            source_sentence: sentence.to_string(),
        }
    }

    fn fixed(
        store: &Arc<MemoryStore>,
        facts: Vec<ExtractedRelation>,
    ) -> RelationshipInference {
        RelationshipInference::new(store.clone()).with_extractor(FixedRelations(facts))
    }

    #[test]
    fn test_guess_entity_type() {
        assert_eq!(guess_entity_type("Acme Corp"), EntityType::Company);
        assert_eq!(guess_entity_type("Palantir Technologies"), EntityType::Company);
        assert_eq!(guess_entity_type("Sam Altman"), EntityType::Person);
        assert_eq!(guess_entity_type("Grace Brewster Hopper"), EntityType::Person);
        assert_eq!(guess_entity_type("OpenAI"), EntityType::Unknown);
        assert_eq!(guess_entity_type("The Big Four Bank Group"), EntityType::Unknown);
    }

    #[tokio::test]
    async fn test_extract_ceo_fact() {
        let store = Arc::new(MemoryStore::new());
        let inference = RelationshipInference::new(store.clone());

        let stored = inference
            .extract_relationships_from_text("Sam Altman is the CEO of OpenAI.")
            .await
            .unwrap();

        let ceo = stored
            .iter()
            .find(|r| r.subject == "Sam Altman" && r.object == "OpenAI")
            .expect("ceo fact");
        assert_eq!(ceo.relationship_type, RelationshipType::Ceo);
        assert_eq!(ceo.confidence, 0.75);
        assert_eq!(ceo.source_text, "Sam Altman is the CEO of OpenAI");

        let subject = store.get_entity(ceo.subject_entity_id).await.unwrap().unwrap();
        assert_eq!(subject.entity_type, EntityType::Person);
        assert_eq!(subject.confidence_score, INFERRED_ENTITY_CONFIDENCE);
        let object = store.get_entity(ceo.object_entity_id).await.unwrap().unwrap();
        assert_eq!(object.entity_type, EntityType::Unknown);
    }

    #[tokio::test]
    async fn test_repeat_extraction_dedups() {
        let store = Arc::new(MemoryStore::new());
        let inference = RelationshipInference::new(store.clone());
        let text = "Microsoft invested in OpenAI. Lyft competes with Uber.";

        let first = inference.extract_relationships_from_text(text).await.unwrap();
        let second = inference.extract_relationships_from_text(text).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        let all = inference.list_relationships(Page::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        let entities = store.list_entities(Page::default(), None).await.unwrap();
        assert_eq!(entities.len(), 4);
    }

    #[tokio::test]
    async fn test_confidence_never_decreases() {
        let store = Arc::new(MemoryStore::new());

        let first = fixed(&store, vec![fact("Acme Corp", "Globex", 0.9, "first")])
            .extract_relationships_from_text("x")
            .await
            .unwrap();
        let second = fixed(&store, vec![fact("Acme Corp", "Globex", 0.5, "second")])
            .extract_relationships_from_text("x")
            .await
            .unwrap();

        assert_eq!(first[0].id, second[0].id);
        assert_eq!(second[0].confidence, 0.9);
        assert_eq!(second[0].source_text, "first");

        let rows = store.list_relationships(Page::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].confidence_score, 0.9);
        assert_eq!(rows[0].source_text, "first");
    }

    #[tokio::test]
    async fn test_empty_source_text_filled_later() {
        let store = Arc::new(MemoryStore::new());

        fixed(&store, vec![fact("Acme Corp", "Globex", 0.5, "")])
            .extract_relationships_from_text("x")
            .await
            .unwrap();
        let later = fixed(&store, vec![fact("Acme Corp", "Globex", 0.8, "later")])
            .extract_relationships_from_text("x")
            .await
            .unwrap();

        assert_eq!(later[0].confidence, 0.8);
        assert_eq!(later[0].source_text, "later");
        let rows = store.list_relationships(Page::default()).await.unwrap();
        assert_eq!(rows[0].source_text, "later");
    }

    #[tokio::test]
    async fn test_endpoints_resolve_case_insensitively() {
        let store = Arc::new(MemoryStore::new());

        let stored = fixed(
            &store,
            vec![
                fact("Acme Corp", "Globex", 0.75, "one"),
                fact("ACME CORP", "Initech", 0.75, "two"),
            ],
        )
        .extract_relationships_from_text("x")
        .await
        .unwrap();

        assert_eq!(stored[0].subject_entity_id, stored[1].subject_entity_id);
        assert_eq!(stored[1].subject, "ACME CORP");

        let inference = RelationshipInference::new(store.clone());
        let edges = inference
            .get_entity_relationships(stored[0].subject_entity_id)
            .await
            .unwrap();
        assert_eq!(edges.len(), 2);

        let globex_edges = inference
            .get_entity_relationships(stored[0].object_entity_id)
            .await
            .unwrap();
        assert_eq!(globex_edges.len(), 1);
    }

    #[tokio::test]
    async fn test_no_facts_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let inference = RelationshipInference::new(store.clone());

        assert!(inference
            .extract_relationships_from_text("OpenAI OpenAI is great")
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .list_entities(Page::default(), None)
            .await
            .unwrap()
            .is_empty());
    }
}
