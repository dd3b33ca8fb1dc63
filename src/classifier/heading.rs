// src/classifier/heading.rs

use once_cell::sync::Lazy;
use regex::Regex;

use crate::classifier::embedding::{cosine_similarity, EmbeddingProvider};
use crate::classifier::schema::Schema;
use crate::utils::error::EmbeddingError;

// Keyword hits are trusted far above any embedding score.
const HARD_MATCH_CONFIDENCE: f32 = 0.95;

// --- Regex Patterns for Prefix Stripping (Lazy Static) ---
// Leading chapter numbering ("IV. ", "3.2 ") is noise for the embedding
// model; the raw block keeps it for keyword/exclude matching.
static ROMAN_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[IVXLCDM]+\b\.?\s*").expect("Failed to compile ROMAN_PREFIX_RE")
});

static DECIMAL_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(\.\d+)*\s*").expect("Failed to compile DECIMAL_PREFIX_RE")
});

/// How a block was matched to a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Hard,
    Semantic,
    None,
}

/// Outcome of classifying a single text block against the schema.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub section_id: Option<String>,
    pub confidence: f32,
    pub matched_by: MatchKind,
}

/// Tunable knobs for the heading decision. Both observed call sites of the
/// source pipeline used different values (0.50 vs 0.55, and different length
/// caps), so neither is hard-coded.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    /// Minimum similarity for a semantic match to count as a heading.
    pub threshold: f32,
    /// Blocks at or above this many chars are content, never headings.
    pub heading_max_len: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: 0.50,
            heading_max_len: 60,
        }
    }
}

/// Strips leading roman-numeral and decimal chapter prefixes. Falls back to
/// the raw block when stripping would leave nothing.
fn normalize_block(raw: &str) -> String {
    let stripped = ROMAN_PREFIX_RE.replace(raw, "");
    let stripped = DECIMAL_PREFIX_RE.replace(&stripped, "");
    let normalized = stripped.trim();
    if normalized.is_empty() {
        raw.to_string()
    } else {
        normalized.to_string()
    }
}

/// Classifies text blocks into schema sections: keyword hard match first
/// (schema order, first match wins), embedding similarity as fallback.
///
/// Label embeddings are computed once at construction and shared across every
/// document of the run.
pub struct HeadingClassifier {
    schema: Schema,
    config: ClassifierConfig,
    provider: Box<dyn EmbeddingProvider>,
    label_embeddings: Vec<Vec<f32>>,
}

impl HeadingClassifier {
    pub fn new(
        schema: Schema,
        provider: Box<dyn EmbeddingProvider>,
        config: ClassifierConfig,
    ) -> Result<Self, EmbeddingError> {
        let label_embeddings = schema
            .rules()
            .iter()
            .map(|rule| provider.embed(&rule.rich_description()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            schema,
            config,
            provider,
            label_embeddings,
        })
    }

    /// Classifies one raw text block.
    ///
    /// Embedding failures propagate; the caller treats them as fatal for the
    /// current document.
    pub fn classify(&self, block: &str) -> Result<ClassificationResult, EmbeddingError> {
        // 1. Hard match: first schema rule with a keyword hit wins outright.
        for rule in self.schema.rules() {
            if rule.keyword_matches(block) {
                return Ok(ClassificationResult {
                    section_id: Some(rule.id.clone()),
                    confidence: HARD_MATCH_CONFIDENCE,
                    matched_by: MatchKind::Hard,
                });
            }
        }

        // 2. Semantic match on the prefix-stripped form.
        let normalized = normalize_block(block);
        let block_embedding = self.provider.embed(&normalized)?;

        let mut ranked: Vec<(usize, f32)> = self
            .label_embeddings
            .iter()
            .enumerate()
            .map(|(idx, label)| (idx, cosine_similarity(&block_embedding, label)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        // Walk the ranking; exclude lists veto candidates against the RAW
        // block. All candidates vetoed means no match at all.
        for (idx, score) in ranked {
            let rule = &self.schema.rules()[idx];
            if rule.excludes(block) {
                continue;
            }
            return Ok(ClassificationResult {
                section_id: Some(rule.id.clone()),
                // Cosine can go negative; confidence is reported in [0, 1].
                confidence: score.max(0.0),
                matched_by: MatchKind::Semantic,
            });
        }

        Ok(ClassificationResult {
            section_id: None,
            confidence: 0.0,
            matched_by: MatchKind::None,
        })
    }

    /// A block starts a new section only when it is short enough to be a
    /// heading AND its match confidence clears the threshold.
    pub fn is_heading(&self, raw_block: &str, result: &ClassificationResult) -> bool {
        raw_block.chars().count() < self.config.heading_max_len
            && result.confidence > self.config.threshold
    }
}
