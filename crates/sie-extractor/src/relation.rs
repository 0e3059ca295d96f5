//! Relation Extraction (RE) module
//!
//! Pattern-based extraction of subject-predicate-object facts. Text is split
//! into sentences and every pattern of every relationship kind is tried on
//! every sentence; all surviving matches are kept, so one sentence can yield
//! several facts of different kinds.

use regex::Regex;
use tracing::{debug, warn};

use crate::normalize::{collapse_whitespace, strip_leading_article};
use crate::{ExtractedRelation, RelationExtractor};
use sie_core::{RelationshipType, Result};

/// Confidence assigned to every pattern match
pub const PATTERN_CONFIDENCE: f64 = 0.75;

/// Sentences are cut to this many characters before matching
pub const MAX_SENTENCE_CHARS: usize = 400;

/// Cleaned subjects longer than this are treated as garbage
pub const MAX_SUBJECT_CHARS: usize = 60;

/// Cleaned objects longer than this are treated as garbage
pub const MAX_OBJECT_CHARS: usize = 80;

// ============================================================================
// Pattern table
// ============================================================================

/// One relationship pattern; matched case-insensitively
#[derive(Debug, Clone, Copy)]
pub struct RelationPattern {
    pub relationship_type: RelationshipType,
    pub pattern: &'static str,
    /// Capture group holding the subject span
    pub subject_group: usize,
    /// Capture group holding the object span
    pub object_group: usize,
}

impl RelationPattern {
    const fn forward(relationship_type: RelationshipType, pattern: &'static str) -> Self {
        Self {
            relationship_type,
            pattern,
            subject_group: 1,
            object_group: 2,
        }
    }
}

/// Default patterns, grouped by kind in evaluation order
pub const DEFAULT_PATTERNS: &[RelationPattern] = &[
    // ceo
    RelationPattern::forward(
        RelationshipType::Ceo,
        r"\b(.{2,60}?)\s+(?:is|was)\s+(?:the\s+)?CEO\s+(?:of\s+)?(.{2,80}?)\b",
    ),
    RelationPattern::forward(
        RelationshipType::Ceo,
        r"\bCEO\s+of\s+(.{2,80}?)\s*[:,\-]?\s*(.{2,60}?)\b",
    ),
    // founder
    RelationPattern::forward(
        RelationshipType::Founder,
        r"\b(.{2,60}?)\s+(?:founded|co-founded|started)\s+(.{2,80}?)\b",
    ),
    RelationPattern::forward(
        RelationshipType::Founder,
        r"\b(.{2,60}?)\s+(?:is|was)\s+(?:a\s+)?founder\s+of\s+(.{2,80}?)\b",
    ),
    // investor
    RelationPattern::forward(
        RelationshipType::Investor,
        r"\b(.{2,80}?)\s+(?:invested in|invests in|backed|funded)\s+(.{2,80}?)\b",
    ),
    // partner
    RelationPattern::forward(
        RelationshipType::Partner,
        r"\b(.{2,80}?)\s+(?:partnered with|partners with|partnered)\s+(.{2,80}?)\b",
    ),
    RelationPattern::forward(
        RelationshipType::Partner,
        r"\bpartnership\s+between\s+(.{2,80}?)\s+and\s+(.{2,80}?)\b",
    ),
    // acquiredBy
    RelationPattern::forward(
        RelationshipType::AcquiredBy,
        r"\b(.{2,80}?)\s+(?:was\s+)?acquired\s+by\s+(.{2,80}?)\b",
    ),
    // competitor
    RelationPattern::forward(
        RelationshipType::Competitor,
        r"\b(.{2,80}?)\s+(?:competes with|competitor of|rival of)\s+(.{2,80}?)\b",
    ),
    // opponent
    RelationPattern::forward(
        RelationshipType::Opponent,
        r"\b(.{2,80}?)\s+(?:criticized|opposed|sued)\s+(.{2,80}?)\b",
    ),
];

// ============================================================================
// Rule-based RE
// ============================================================================

struct CompiledPattern {
    regex: Regex,
    relationship_type: RelationshipType,
    subject_group: usize,
    object_group: usize,
}

/// Rule-based relation extractor
pub struct RuleBasedRe {
    patterns: Vec<CompiledPattern>,
}

impl RuleBasedRe {
    /// Create a new rule-based RE with the default patterns
    pub fn new() -> Self {
        Self::with_patterns(DEFAULT_PATTERNS)
    }

    /// Create with a custom pattern table
    pub fn with_patterns(patterns: &[RelationPattern]) -> Self {
        let mut re = Self {
            patterns: Vec::with_capacity(patterns.len()),
        };
        for pattern in patterns {
            re.add_pattern(pattern);
        }
        re
    }

    fn add_pattern(&mut self, pattern: &RelationPattern) {
        match Regex::new(&format!("(?i){}", pattern.pattern)) {
            Ok(regex) => self.patterns.push(CompiledPattern {
                regex,
                relationship_type: pattern.relationship_type,
                subject_group: pattern.subject_group,
                object_group: pattern.object_group,
            }),
            Err(e) => warn!(
                pattern = pattern.pattern,
                error = %e,
                "skipping invalid relationship pattern"
            ),
        }
    }

    /// Number of compiled patterns
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    fn extract_from_sentence(&self, sentence: &str, out: &mut Vec<ExtractedRelation>) {
        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(sentence) {
                let (Some(subject), Some(object)) = (
                    caps.get(pattern.subject_group),
                    caps.get(pattern.object_group),
                ) else {
                    continue;
                };

                let subject = clean_span(subject.as_str());
                let object = clean_span(object.as_str());

                if subject.is_empty() || object.is_empty() {
                    continue;
                }
                if subject.to_lowercase() == object.to_lowercase() {
                    continue;
                }
                if subject.chars().count() > MAX_SUBJECT_CHARS
                    || object.chars().count() > MAX_OBJECT_CHARS
                {
                    continue;
                }

                out.push(ExtractedRelation {
                    subject,
                    object,
                    relationship_type: pattern.relationship_type,
                    confidence: PATTERN_CONFIDENCE,
                    source_sentence: sentence.to_string(),
                });
            }
        }
    }
}

impl Default for RuleBasedRe {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationExtractor for RuleBasedRe {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedRelation>> {
        let mut relations = Vec::new();

        for sentence in split_sentences(text) {
            let sentence = truncate_chars(sentence, MAX_SENTENCE_CHARS);
            self.extract_from_sentence(&sentence, &mut relations);
        }

        debug!(count = relations.len(), "extracted relationship facts");
        Ok(relations)
    }
}

/// Split on runs of `.`, `!`, `?` and newlines, dropping blank pieces
pub fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| matches!(c, '.' | '!' | '?' | '\n'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Tidy a captured span into an entity name
pub(crate) fn clean_span(span: &str) -> String {
    let stripped = strip_leading_article(span);
    let unmarked: String = stripped.chars().filter(|c| !matches!(c, '@' | '#')).collect();
    collapse_whitespace(&unmarked)
        .trim_end_matches(&[',', ':', ';'][..])
        .trim()
        .to_string()
}
