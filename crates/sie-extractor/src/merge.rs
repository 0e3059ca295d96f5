//! Similarity merging
//!
//! Greedy single pass over candidates in extraction order. Each unassigned
//! candidate seeds a new group and pulls in every later unassigned
//! candidate similar enough to the seed. The comparison target stays the
//! seed for the whole scan; members joining a group do not extend its reach.

use tracing::debug;

use crate::normalize::normalize;
use crate::{CandidateMention, ExtractedCandidate, MergedCandidate};

/// Default similarity a candidate needs to join a seed's group
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.85;

/// Bonus applied when one normalized name contains the other
pub const SUBSTRING_BONUS: f64 = 0.2;

/// Normalized Levenshtein ratio between the normalized forms, no bonus
pub fn edit_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize(a), &normalize(b))
}

/// Similarity between two candidate names in `[0, 1]`
pub fn similarity(a: &str, b: &str) -> f64 {
    let na = normalize(a);
    let nb = normalize(b);
    if na == nb {
        return 1.0;
    }

    let mut score = strsim::normalized_levenshtein(&na, &nb);
    if na.contains(nb.as_str()) || nb.contains(na.as_str()) {
        score = (score + SUBSTRING_BONUS).min(1.0);
    }
    score
}

/// Seed-anchored candidate clustering
#[derive(Debug, Clone)]
pub struct SimilarityMerger {
    threshold: f64,
}

impl SimilarityMerger {
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_MERGE_THRESHOLD,
        }
    }

    /// Set merge threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn merge(&self, candidates: &[ExtractedCandidate]) -> Vec<MergedCandidate> {
        let mut assigned = vec![false; candidates.len()];
        let mut merged = Vec::new();

        for (i, seed) in candidates.iter().enumerate() {
            if assigned[i] {
                continue;
            }
            assigned[i] = true;
            let mut group = vec![seed];

            for (j, other) in candidates.iter().enumerate().skip(i + 1) {
                if assigned[j] {
                    continue;
                }
                if similarity(&seed.name, &other.name) >= self.threshold {
                    group.push(other);
                    assigned[j] = true;
                }
            }

            merged.push(fold_group(&group));
        }

        debug!(
            candidates = candidates.len(),
            groups = merged.len(),
            "merged entity candidates"
        );
        merged
    }
}

impl Default for SimilarityMerger {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge with the default threshold
pub fn merge_similar(candidates: &[ExtractedCandidate]) -> Vec<MergedCandidate> {
    SimilarityMerger::new().merge(candidates)
}

/// Canonical record for one group: name and type of the most confident
/// member (earliest wins ties), mean confidence capped at 1.0
fn fold_group(group: &[&ExtractedCandidate]) -> MergedCandidate {
    let mut best = group[0];
    for &candidate in &group[1..] {
        if candidate.confidence > best.confidence {
            best = candidate;
        }
    }

    let total: f64 = group.iter().map(|c| c.confidence).sum();
    let mean = total / group.len() as f64;

    MergedCandidate {
        canonical_name: best.name.clone(),
        entity_type: best.entity_type,
        confidence: mean.min(1.0),
        mentions: group
            .iter()
            .map(|c| CandidateMention {
                text: c.name.clone(),
                context: c.context.clone(),
                confidence: c.confidence,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sie_core::EntityType;

    fn candidate(name: &str, entity_type: EntityType, confidence: f64) -> ExtractedCandidate {
        ExtractedCandidate {
            name: name.to_string(),
            entity_type,
            confidence,
            context: "ctx".to_string(),
        }
    }

    #[test]
    fn test_similarity_identity() {
        for name in ["OpenAI", "", "The Big Corp.", "Sam Altman", "@x"] {
            assert_eq!(similarity(name, name), 1.0);
        }
        assert_eq!(similarity("The Big Corp.", "big corp"), 1.0);
    }

    #[test]
    fn test_substring_bonus() {
        let without = edit_ratio("Open", "OpenAI");
        let with = similarity("Open", "OpenAI");
        assert!(with > without);
        assert!((with - (without + SUBSTRING_BONUS)).abs() < 1e-9);
        assert!(similarity("Open", "Open Source Initiative") <= 1.0);
    }

    #[test]
    fn test_similarity_symmetric() {
        let a = similarity("Sam Altman", "Sam Altmann");
        let b = similarity("Sam Altmann", "Sam Altman");
        assert_eq!(a, b);
    }

    #[test]
    fn test_openai_variants_merge() {
        let candidates = vec![
            candidate("OpenAI", EntityType::Other, 0.6),
            candidate("openai", EntityType::Other, 0.6),
            candidate("Open AI", EntityType::Other, 0.6),
            candidate("Sam Altman", EntityType::Other, 0.6),
        ];

        let merged = merge_similar(&candidates);
        assert_eq!(merged.len(), 2);

        assert_eq!(merged[0].canonical_name, "OpenAI");
        assert_eq!(merged[0].mentions.len(), 3);
        assert!((merged[0].confidence - 0.6).abs() < 1e-9);

        assert_eq!(merged[1].canonical_name, "Sam Altman");
        assert_eq!(merged[1].mentions.len(), 1);
    }

    #[test]
    fn test_best_confidence_picks_canonical() {
        let candidates = vec![
            candidate("Open AI", EntityType::Other, 0.6),
            candidate("@OpenAI", EntityType::Company, 0.7),
        ];

        let merged = merge_similar(&candidates);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].canonical_name, "@OpenAI");
        assert_eq!(merged[0].entity_type, EntityType::Company);
        assert!((merged[0].confidence - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_groups_anchor_on_seed() {
        // b is close to both a and c, but a and c are not close to each
        // other; c must not ride along through b.
        let merger = SimilarityMerger::new().with_threshold(0.65);
        let a = "abcdefghij";
        let b = "abcdefgxyz";
        let c = "abcdxyzxyz";
        assert!(similarity(a, b) >= 0.65);
        assert!(similarity(b, c) >= 0.65);
        assert!(similarity(a, c) < 0.65);

        let candidates = vec![
            candidate(a, EntityType::Other, 0.6),
            candidate(b, EntityType::Other, 0.6),
            candidate(c, EntityType::Other, 0.6),
        ];
        let merged = merger.merge(&candidates);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].mentions.len(), 2);
        assert_eq!(merged[1].canonical_name, c);
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_similar(&[]).is_empty());
    }
}
