//! Candidate extraction
//!
//! Rule-based scan for entity-like spans. No trained model is involved:
//! handle tokens are taken as companies, runs of capitalized words as
//! untyped "other" candidates.

use regex::Regex;
use tracing::{debug, warn};

use crate::{EntityExtractor, ExtractedCandidate};
use sie_core::{EntityType, Result};

/// One extraction rule
struct CandidatePattern {
    regex: Regex,
    entity_type: EntityType,
    confidence: f64,
    /// Matches shorter than this many characters are skipped
    min_len: usize,
}

/// Rule-based candidate extractor
///
/// Rules run in registration order and their matches are concatenated,
/// not interleaved: every handle match precedes every capitalized-phrase
/// match. The merge step relies on this order to break confidence ties.
pub struct CandidateExtractor {
    patterns: Vec<CandidatePattern>,
}

impl CandidateExtractor {
    /// Create a new extractor with the default rules
    pub fn new() -> Self {
        let mut extractor = Self {
            patterns: Vec::new(),
        };
        extractor.init_patterns();
        extractor
    }

    fn init_patterns(&mut self) {
        // @handles
        self.add_pattern(r"@[A-Za-z0-9_]+", EntityType::Company, 0.7, 0);

        // Proper nouns: capitalized words separated by single spaces
        self.add_pattern(
            r"\b[A-Z][a-z]+(?: [A-Z][a-z]+)*\b",
            EntityType::Other,
            0.6,
            3,
        );
    }

    /// Add a regex rule
    fn add_pattern(
        &mut self,
        pattern: &str,
        entity_type: EntityType,
        confidence: f64,
        min_len: usize,
    ) {
        match Regex::new(pattern) {
            Ok(regex) => self.patterns.push(CandidatePattern {
                regex,
                entity_type,
                confidence,
                min_len,
            }),
            Err(e) => warn!(pattern, error = %e, "skipping invalid candidate pattern"),
        }
    }
}

impl Default for CandidateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor for CandidateExtractor {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedCandidate>> {
        let mut candidates = Vec::new();

        for pattern in &self.patterns {
            for mat in pattern.regex.find_iter(text) {
                let name = mat.as_str().trim();
                if name.chars().count() < pattern.min_len {
                    continue;
                }
                candidates.push(ExtractedCandidate {
                    name: name.to_string(),
                    entity_type: pattern.entity_type,
                    confidence: pattern.confidence,
                    context: text.to_string(),
                });
            }
        }

        debug!(count = candidates.len(), "extracted entity candidates");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(candidates: &[ExtractedCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_handles_come_first() {
        let extractor = CandidateExtractor::new();
        let text = "Sam Altman replied to @openai and @sama_fan yesterday";
        let candidates = extractor.extract(text).unwrap();

        assert_eq!(names(&candidates), vec!["@openai", "@sama_fan", "Sam Altman"]);
        assert_eq!(candidates[0].entity_type, EntityType::Company);
        assert_eq!(candidates[0].confidence, 0.7);
        assert_eq!(candidates[2].entity_type, EntityType::Other);
        assert_eq!(candidates[2].confidence, 0.6);
    }

    #[test]
    fn test_context_is_full_text() {
        let extractor = CandidateExtractor::new();
        let text = "Microsoft backed the deal.";
        let candidates = extractor.extract(text).unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].context, text);
    }

    #[test]
    fn test_short_and_mixed_case_words_skipped() {
        let extractor = CandidateExtractor::new();
        // "Al" is too short; "CEO" and "OpenAI" are not Capitalized-lowercase words
        let candidates = extractor.extract("Al is the CEO of OpenAI").unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_phrase_runs_use_single_spaces() {
        let extractor = CandidateExtractor::new();
        let candidates = extractor
            .extract("We met Grace Brewster Hopper and Alan  Turing")
            .unwrap();
        assert_eq!(
            names(&candidates),
            vec!["Grace Brewster Hopper", "Alan", "Turing"]
        );
    }
}
