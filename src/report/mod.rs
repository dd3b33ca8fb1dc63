// src/report/mod.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::{Schema, Translations};
use crate::document::Document;

/// Batch-level audit: for every schema section, which file detected which
/// headings. Every section id is present even when no file matched it, so
/// gaps in the corpus are visible at a glance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasterSummary {
    sections: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl MasterSummary {
    pub fn new(schema: &Schema) -> Self {
        let sections = schema
            .ids()
            .map(|id| (id.to_string(), BTreeMap::new()))
            .collect();
        Self { sections }
    }

    /// Folds one document's detected headings into the summary.
    pub fn record(&mut self, file_name: &str, document: &Document) {
        for (section_id, headings) in &document.detected_headings {
            self.sections
                .entry(section_id.clone())
                .or_default()
                .insert(file_name.to_string(), headings.clone());
        }
    }

    pub fn sections(&self) -> &BTreeMap<String, BTreeMap<String, Vec<String>>> {
        &self.sections
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Complete,
    Incomplete,
}

/// Completeness verdict for one emitted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationEntry {
    pub file: String,
    pub status: ValidationStatus,
    pub missing: Vec<String>,
}

/// Lists the schema sections (by translated display name, matching the
/// document's content keys) with no accumulated text.
pub fn missing_sections(
    document: &Document,
    schema: &Schema,
    translations: &Translations,
) -> Vec<String> {
    schema
        .ids()
        .map(|id| translations.display_name(id, &document.metadata.language))
        .filter(|name| !document.has_content(name))
        .collect()
}

pub fn validate_document(
    file: &str,
    document: &Document,
    schema: &Schema,
    translations: &Translations,
) -> ValidationEntry {
    let missing = missing_sections(document, schema, translations);
    let status = if missing.is_empty() {
        ValidationStatus::Complete
    } else {
        ValidationStatus::Incomplete
    };
    ValidationEntry {
        file: file.to_string(),
        status,
        missing,
    }
}
