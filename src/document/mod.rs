// src/document/mod.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::Translations;

/// Per-document header of the JSON artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub file_name: String,
    /// 2-letter language code from detection ("id" or "en").
    pub language: String,
}

/// The normalized output for one manual: accumulated chapter text keyed by
/// the translated section name, plus the audit trail of which headings were
/// detected where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: Metadata,
    pub content: BTreeMap<String, String>,
    pub detected_headings: BTreeMap<String, Vec<String>>,
}

impl Document {
    /// True when `section_name` has accumulated non-whitespace content.
    pub fn has_content(&self, section_name: &str) -> bool {
        self.content
            .get(section_name)
            .map(|text| !text.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Formats a heading audit entry: the heading as printed in the PDF plus the
/// page it appeared on.
pub fn audit_entry(heading_text: &str, page: usize) -> String {
    format!("{} (Hal. {})", heading_text, page)
}

/// Builds one `Document` block by block.
///
/// State machine: NoSection (initial) or InSection(id). A heading switches
/// the open section; content appends to the open section or is dropped when
/// none is open yet. A block is never attributed to more than one section.
pub struct DocumentAccumulator<'a> {
    translations: &'a Translations,
    language: String,
    current_section: Option<String>,
    document: Document,
}

impl<'a> DocumentAccumulator<'a> {
    pub fn new(file_name: &str, language: &str, translations: &'a Translations) -> Self {
        Self {
            translations,
            language: language.to_string(),
            current_section: None,
            document: Document {
                metadata: Metadata {
                    file_name: file_name.to_string(),
                    language: language.to_string(),
                },
                content: BTreeMap::new(),
                detected_headings: BTreeMap::new(),
            },
        }
    }

    pub fn current_section(&self) -> Option<&str> {
        self.current_section.as_deref()
    }

    /// Opens `section_id` and records the audit entry, deduplicated by exact
    /// string equality (same heading on two pages yields two entries because
    /// the page number differs).
    pub fn start_section(&mut self, section_id: &str, heading_text: &str, page: usize) {
        self.current_section = Some(section_id.to_string());

        let entry = audit_entry(heading_text, page);
        let entries = self
            .document
            .detected_headings
            .entry(section_id.to_string())
            .or_default();
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    /// Appends a content block to the open section. Dropped silently when no
    /// section has been opened yet.
    pub fn push_content(&mut self, block: &str) {
        let Some(section_id) = &self.current_section else {
            return;
        };
        let display = self.translations.display_name(section_id, &self.language);
        let text = self.document.content.entry(display).or_default();
        text.push_str(block);
        text.push(' ');
    }

    pub fn finish(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::schema::SectionRule;
    use crate::classifier::{
        ClassifierConfig, EmbeddingProvider, HeadingClassifier, Schema,
    };
    use crate::utils::error::EmbeddingError;

    fn empty_translations() -> Translations {
        Translations::empty()
    }

    #[test]
    fn accumulation_preserves_reading_order() {
        let translations = empty_translations();
        let mut acc = DocumentAccumulator::new("m.pdf", "en", &translations);
        acc.start_section("A", "Heading One", 1);
        acc.push_content("a");
        acc.push_content("b");
        acc.start_section("B", "Heading Two", 2);
        acc.push_content("c");

        let doc = acc.finish();
        assert_eq!(doc.content.get("A").map(String::as_str), Some("a b "));
        assert_eq!(doc.content.get("B").map(String::as_str), Some("c "));
    }

    #[test]
    fn content_before_any_heading_is_dropped() {
        let translations = empty_translations();
        let mut acc = DocumentAccumulator::new("m.pdf", "en", &translations);
        assert_eq!(acc.current_section(), None);
        acc.push_content("preamble text");
        acc.start_section("A", "Heading", 1);
        assert_eq!(acc.current_section(), Some("A"));
        acc.push_content("body");

        let doc = acc.finish();
        assert_eq!(doc.content.len(), 1);
        assert_eq!(doc.content.get("A").map(String::as_str), Some("body "));
    }

    #[test]
    fn audit_entries_deduplicate_by_exact_string() {
        let translations = empty_translations();
        let mut acc = DocumentAccumulator::new("m.pdf", "en", &translations);
        // Same heading on two different pages: two entries.
        acc.start_section("A", "Safety Guidelines", 3);
        acc.start_section("A", "Safety Guidelines", 7);
        // Repeated on the same page: still one entry for that page.
        acc.start_section("A", "Safety Guidelines", 3);

        let doc = acc.finish();
        assert_eq!(
            doc.detected_headings.get("A"),
            Some(&vec![
                "Safety Guidelines (Hal. 3)".to_string(),
                "Safety Guidelines (Hal. 7)".to_string(),
            ])
        );
    }

    #[test]
    fn content_keys_use_translated_section_names() {
        let mut translations = Translations::empty();
        translations.insert("7.1 Warranty", "id", "7.1 Garansi");

        let mut acc = DocumentAccumulator::new("m.pdf", "id", &translations);
        acc.start_section("7.1 Warranty", "GARANSI", 10);
        acc.push_content("berlaku satu tahun");
        let doc = acc.finish();
        assert_eq!(
            doc.content.get("7.1 Garansi").map(String::as_str),
            Some("berlaku satu tahun ")
        );
        // Audit entries stay keyed by the internal id.
        assert!(doc.detected_headings.contains_key("7.1 Warranty"));
    }

    #[test]
    fn document_round_trips_through_json() {
        let translations = empty_translations();
        let mut acc = DocumentAccumulator::new("manual.pdf", "en", &translations);
        acc.start_section("A", "Intro", 1);
        acc.push_content("hello");
        acc.start_section("B", "Specs", 4);
        acc.push_content("220 V");
        let doc = acc.finish();

        let json = serde_json::to_string_pretty(&doc).unwrap();
        let parsed: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(parsed.content, doc.content);
        assert_eq!(parsed.detected_headings, doc.detected_headings);
    }

    /// Deterministic embedding stand-in for the end-to-end scenario.
    struct FixedEmbedder;

    impl EmbeddingProvider for FixedEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            // Rich description of "A" vs anything else: orthogonal.
            if text.starts_with("A ") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }
    }

    #[test]
    fn end_to_end_hard_heading_then_content() {
        let schema = Schema::new(vec![SectionRule {
            id: "A".to_string(),
            keywords: vec!["foo".to_string()],
            exclude: vec![],
        }])
        .unwrap();
        let classifier = HeadingClassifier::new(
            schema,
            Box::new(FixedEmbedder),
            ClassifierConfig::default(),
        )
        .unwrap();
        let translations = empty_translations();
        let mut acc = DocumentAccumulator::new("m.pdf", "en", &translations);

        for block in ["FOO Section", "hello world"] {
            let result = classifier.classify(block).unwrap();
            if classifier.is_heading(block, &result) {
                if let Some(id) = &result.section_id {
                    acc.start_section(id, block, 1);
                }
            } else {
                acc.push_content(block);
            }
        }

        let doc = acc.finish();
        assert_eq!(
            doc.content.get("A").map(String::as_str),
            Some("hello world ")
        );
        assert_eq!(
            doc.detected_headings.get("A"),
            Some(&vec!["FOO Section (Hal. 1)".to_string()])
        );
    }
}
