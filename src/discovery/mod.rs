// src/discovery/mod.rs

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::classifier::Schema;
use crate::pdf;
use crate::utils::error::AppError;

// Heading-shaped lines: long enough to mean something, short enough to not
// be body text.
const MIN_CANDIDATE_CHARS: usize = 5;
const MAX_CANDIDATE_CHARS: usize = 39;

/// A heading candidate not yet covered by the schema, with the number of
/// documents it appeared in.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub text: String,
    pub document_count: usize,
}

/// Scans the front pages of every PDF under `input_root` for heading-shaped
/// lines that no schema keyword covers, ranked by how many documents contain
/// them. Useful for growing the keyword lists when a new manual family shows
/// up.
///
/// Unreadable PDFs are skipped; discovery is a best-effort survey.
pub fn discover_keywords(
    input_root: &Path,
    schema: &Schema,
    pages_per_file: usize,
    top: usize,
) -> Result<Vec<Candidate>, AppError> {
    let pdf_files = pdf::find_pdf_files(input_root);
    if pdf_files.is_empty() {
        return Err(AppError::Config(format!(
            "No PDF files found under {}",
            input_root.display()
        )));
    }
    tracing::info!("Scanning {} PDF files for keyword candidates", pdf_files.len());

    let mut document_counts: HashMap<String, usize> = HashMap::new();

    for pdf_path in &pdf_files {
        let pages = match pdf::extract_pages(pdf_path) {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", pdf_path.display(), e);
                continue;
            }
        };

        // Count each candidate once per document.
        let mut seen_in_file: HashSet<String> = HashSet::new();
        for page in pages.iter().take(pages_per_file) {
            for line in page.lines().map(str::trim) {
                if is_candidate(line, schema) {
                    seen_in_file.insert(line.to_string());
                }
            }
        }
        for candidate in seen_in_file {
            *document_counts.entry(candidate).or_insert(0) += 1;
        }
    }

    let mut candidates: Vec<Candidate> = document_counts
        .into_iter()
        .map(|(text, document_count)| Candidate {
            text,
            document_count,
        })
        .collect();
    // Most frequent first; ties broken alphabetically for stable output.
    candidates.sort_by(|a, b| {
        b.document_count
            .cmp(&a.document_count)
            .then_with(|| a.text.cmp(&b.text))
    });
    candidates.truncate(top);
    Ok(candidates)
}

fn is_candidate(line: &str, schema: &Schema) -> bool {
    let chars = line.chars().count();
    chars >= MIN_CANDIDATE_CHARS
        && chars <= MAX_CANDIDATE_CHARS
        && !line.chars().all(|c| c.is_ascii_digit())
        && !schema.any_keyword_covers(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::schema::SectionRule;

    fn schema() -> Schema {
        Schema::new(vec![SectionRule {
            id: "7.1 Warranty".to_string(),
            keywords: vec!["warranty".to_string()],
            exclude: vec![],
        }])
        .unwrap()
    }

    #[test]
    fn candidate_filter_rejects_covered_short_and_numeric_lines() {
        let schema = schema();
        assert!(is_candidate("Quick Start Guide", &schema));
        assert!(is_candidate("Daftar Isi", &schema));
        // Covered by an existing keyword.
        assert!(!is_candidate("Limited Warranty", &schema));
        // Too short, too long, purely numeric.
        assert!(!is_candidate("Bab", &schema));
        assert!(!is_candidate(&"x".repeat(40), &schema));
        assert!(!is_candidate("2024", &schema));
    }

    #[test]
    fn candidate_boundaries() {
        let schema = schema();
        assert!(is_candidate(&"x".repeat(5), &schema));
        assert!(is_candidate(&"x".repeat(39), &schema));
        assert!(!is_candidate(&"x".repeat(4), &schema));
        assert!(!is_candidate(&"x".repeat(40), &schema));
    }

    #[test]
    fn discovery_errors_on_empty_input_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_keywords(dir.path(), &schema(), 10, 50);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
