//! Confidence reconciliation policy
//!
//! Both store reconcilers merge an incoming observation into an existing
//! row the same way: confidence only ever rises to the max observed, and
//! source text is first-writer-wins (filled only while still empty).

/// What a reconciler knows about a row: its confidence and, for
/// relationships, the sentence it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub confidence: f64,
    pub source_text: Option<String>,
}

impl Evidence {
    /// Evidence carrying only a confidence score
    pub fn confidence(confidence: f64) -> Self {
        Self {
            confidence,
            source_text: None,
        }
    }

    pub fn with_source_text(mut self, text: impl Into<String>) -> Self {
        self.source_text = Some(text.into());
        self
    }
}

/// Merge `incoming` into `existing`
pub fn reconcile(existing: &Evidence, incoming: &Evidence) -> Evidence {
    let confidence = existing.confidence.max(incoming.confidence);

    let source_text = match existing.source_text.as_deref() {
        Some(text) if !text.is_empty() => Some(text.to_string()),
        _ => incoming
            .source_text
            .clone()
            .or_else(|| existing.source_text.clone()),
    };

    Evidence {
        confidence,
        source_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_never_decreases() {
        let existing = Evidence::confidence(0.9);
        let merged = reconcile(&existing, &Evidence::confidence(0.4));
        assert_eq!(merged.confidence, 0.9);

        let merged = reconcile(&merged, &Evidence::confidence(0.95));
        assert_eq!(merged.confidence, 0.95);
    }

    #[test]
    fn test_source_text_first_writer_wins() {
        let existing = Evidence::confidence(0.75).with_source_text("first");
        let merged = reconcile(
            &existing,
            &Evidence::confidence(0.75).with_source_text("second"),
        );
        assert_eq!(merged.source_text.as_deref(), Some("first"));
    }

    #[test]
    fn test_source_text_filled_when_empty() {
        let existing = Evidence::confidence(0.5).with_source_text("");
        let merged = reconcile(
            &existing,
            &Evidence::confidence(0.75).with_source_text("Sam Altman is the CEO of OpenAI"),
        );
        assert_eq!(
            merged.source_text.as_deref(),
            Some("Sam Altman is the CEO of OpenAI")
        );
        assert_eq!(merged.confidence, 0.75);
    }

    #[test]
    fn test_entity_evidence_has_no_source_text() {
        let merged = reconcile(&Evidence::confidence(0.6), &Evidence::confidence(0.7));
        assert_eq!(merged.source_text, None);
    }
}
