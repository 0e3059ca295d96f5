//! Entity resolution workflow
//!
//! Extract candidates, merge look-alikes, then reconcile every merged
//! candidate and its mentions against the store inside one transaction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::merge::SimilarityMerger;
use crate::ner::CandidateExtractor;
use crate::{EntityExtractor, MergedCandidate};
use sie_core::{
    reconcile, Entity, EntityId, EntityMention, EntityType, Evidence, KnowledgeStore, NewEntity,
    NewMention, Page, Result, StoreTransaction,
};

/// Default result size for name searches
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Summary of one entity touched by a resolution call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub id: EntityId,
    pub canonical_name: String,
    pub entity_type: EntityType,
    pub confidence_score: f64,
}

impl From<&Entity> for ResolvedEntity {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            canonical_name: entity.canonical_name.clone(),
            entity_type: entity.entity_type,
            confidence_score: entity.confidence_score,
        }
    }
}

/// Resolves free text into canonical entities
pub struct EntityResolver {
    store: Arc<dyn KnowledgeStore>,
    extractor: Box<dyn EntityExtractor>,
    merger: SimilarityMerger,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self {
            store,
            extractor: Box::new(CandidateExtractor::new()),
            merger: SimilarityMerger::new(),
        }
    }

    /// Replace the candidate extractor
    pub fn with_extractor(mut self, extractor: impl EntityExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Replace the merger
    pub fn with_merger(mut self, merger: SimilarityMerger) -> Self {
        self.merger = merger;
        self
    }

    /// Resolve every entity mentioned in `text`
    ///
    /// Returns one summary per merged candidate, in extraction order. All
    /// writes are committed together; on error nothing is persisted.
    pub async fn resolve_entities_in_text(&self, text: &str) -> Result<Vec<ResolvedEntity>> {
        let candidates = self.extractor.extract(text)?;
        let merged = self.merger.merge(&candidates);
        if merged.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.store.begin().await?;
        let mut resolved = Vec::with_capacity(merged.len());
        for candidate in &merged {
            let entity = store_candidate(tx.as_mut(), candidate).await?;
            resolved.push(ResolvedEntity::from(&entity));
        }
        tx.commit().await?;

        info!(
            store = self.store.name(),
            candidates = candidates.len(),
            entities = resolved.len(),
            "resolved entities"
        );
        Ok(resolved)
    }

    /// List entities, optionally of one type
    pub async fn list_entities(
        &self,
        page: Page,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<Entity>> {
        self.store.list_entities(page, entity_type).await
    }

    pub async fn get_entity(&self, id: EntityId) -> Result<Option<Entity>> {
        self.store.get_entity(id).await
    }

    /// Case-insensitive substring search on canonical names
    pub async fn search_entities(&self, query: &str, limit: usize) -> Result<Vec<Entity>> {
        self.store.search_entities(query, limit).await
    }

    pub async fn get_entity_mentions(&self, entity_id: EntityId) -> Result<Vec<EntityMention>> {
        self.store.get_entity_mentions(entity_id).await
    }
}

/// Upsert one merged candidate and record its unseen mentions
async fn store_candidate(
    tx: &mut dyn StoreTransaction,
    candidate: &MergedCandidate,
) -> Result<Entity> {
    let entity = match tx
        .find_entity(&candidate.canonical_name, candidate.entity_type)
        .await?
    {
        Some(mut existing) => {
            let merged = reconcile(
                &Evidence::confidence(existing.confidence_score),
                &Evidence::confidence(candidate.confidence),
            );
            if merged.confidence != existing.confidence_score {
                tx.update_entity_confidence(existing.id, merged.confidence)
                    .await?;
                existing.confidence_score = merged.confidence;
            }
            existing
        }
        None => {
            tx.insert_entity(NewEntity {
                canonical_name: candidate.canonical_name.clone(),
                entity_type: candidate.entity_type,
                confidence_score: candidate.confidence,
            })
            .await?
        }
    };

    for mention in &candidate.mentions {
        if tx.find_mention(entity.id, &mention.text).await?.is_some() {
            continue;
        }
        tx.insert_mention(NewMention {
            entity_id: entity.id,
            mention_text: mention.text.clone(),
            context: mention.context.clone(),
            source_url: None,
            confidence_score: mention.confidence,
        })
        .await?;
    }

    debug!(
        entity_id = entity.id,
        name = %entity.canonical_name,
        mentions = candidate.mentions.len(),
        "stored entity candidate"
    );
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtractedCandidate;
    use sie_core::MemoryStore;

    fn resolver() -> (EntityResolver, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (EntityResolver::new(store.clone()), store)
    }

    /// Emits a fixed candidate list regardless of input
    struct FixedExtractor(Vec<ExtractedCandidate>);

    impl EntityExtractor for FixedExtractor {
        fn extract(&self, _text: &str) -> Result<Vec<ExtractedCandidate>> {
            Ok(self.0.clone())
        }
    }

    fn fixed(name: &str, confidence: f64) -> FixedExtractor {
        FixedExtractor(vec![ExtractedCandidate {
            name: name.to_string(),
            entity_type: EntityType::Company,
            confidence,
            context: format!("{name} context"),
        }])
    }

    #[tokio::test]
    async fn test_resolve_handles_and_phrases() {
        let (resolver, store) = resolver();
        let resolved = resolver
            .resolve_entities_in_text("Sam Altman replied to @openai about Openai")
            .await
            .unwrap();

        let names: Vec<_> = resolved.iter().map(|e| e.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["@openai", "Sam Altman"]);
        assert_eq!(resolved[0].entity_type, EntityType::Company);
        assert_eq!(resolved[1].entity_type, EntityType::Other);

        // "@openai" and "Openai" fold into one entity carrying both mentions
        let mentions = store.get_entity_mentions(resolved[0].id).await.unwrap();
        let texts: Vec<_> = mentions.iter().map(|m| m.mention_text.as_str()).collect();
        assert_eq!(texts, vec!["@openai", "Openai"]);
        assert!((resolved[0].confidence_score - 0.65).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let (resolver, store) = resolver();
        let text = "Satya Nadella met Sam Altman";

        let first = resolver.resolve_entities_in_text(text).await.unwrap();
        let second = resolver.resolve_entities_in_text(text).await.unwrap();

        assert_eq!(first, second);
        let all = store.list_entities(Page::default(), None).await.unwrap();
        assert_eq!(all.len(), 2);
        for entity in &all {
            let mentions = store.get_entity_mentions(entity.id).await.unwrap();
            assert_eq!(mentions.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_confidence_only_rises() {
        let store = Arc::new(MemoryStore::new());

        let high = EntityResolver::new(store.clone()).with_extractor(fixed("Acme", 0.9));
        let first = high.resolve_entities_in_text("x").await.unwrap();
        assert_eq!(first[0].confidence_score, 0.9);

        let low = EntityResolver::new(store.clone()).with_extractor(fixed("Acme", 0.4));
        let second = low.resolve_entities_in_text("x").await.unwrap();
        assert_eq!(second[0].id, first[0].id);
        assert_eq!(second[0].confidence_score, 0.9);

        let stored = store.get_entity(first[0].id).await.unwrap().unwrap();
        assert_eq!(stored.confidence_score, 0.9);
        // same mention text, recorded once
        assert_eq!(store.get_entity_mentions(stored.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_candidates_writes_nothing() {
        let (resolver, store) = resolver();
        let resolved = resolver
            .resolve_entities_in_text("nothing capitalized here")
            .await
            .unwrap();

        assert!(resolved.is_empty());
        assert!(store
            .list_entities(Page::default(), None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_read_operations() {
        let (resolver, _store) = resolver();
        resolver
            .resolve_entities_in_text("Grace Hopper and @acme_corp")
            .await
            .unwrap();

        let companies = resolver
            .list_entities(Page::default(), Some(EntityType::Company))
            .await
            .unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].canonical_name, "@acme_corp");

        let found = resolver
            .search_entities("hopp", DEFAULT_SEARCH_LIMIT)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].canonical_name, "Grace Hopper");

        assert!(resolver.get_entity(9999).await.unwrap().is_none());
        assert!(resolver.get_entity_mentions(9999).await.unwrap().is_empty());
    }
}
