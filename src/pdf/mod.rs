// src/pdf/mod.rs

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::utils::error::ExtractionError;

// Caller-side block filter: anything shorter is page furniture or noise.
const MIN_BLOCK_CHARS: usize = 5;

// Language detection samples the front matter only.
const LANGUAGE_SAMPLE_PAGES: usize = 2;

/// Extracts the text of every page of a PDF file, in page order.
///
/// A document where no page yields text is reported as `Empty` so the caller
/// can skip it instead of emitting a hollow JSON artifact.
pub fn extract_pages<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ExtractionError> {
    let bytes = std::fs::read(path)?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| ExtractionError::Parse(e.to_string()))?;
    if pages.iter().all(|page| page.trim().is_empty()) {
        return Err(ExtractionError::Empty);
    }
    Ok(pages)
}

/// Detects the document language from the first pages, as a 2-letter code.
/// Only Indonesian is distinguished; everything else (including detection
/// failure on short samples) falls back to English.
pub fn detect_language(pages: &[String]) -> &'static str {
    let sample = pages
        .iter()
        .take(LANGUAGE_SAMPLE_PAGES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    match whatlang::detect(&sample) {
        Some(info) if info.lang() == whatlang::Lang::Ind => "id",
        _ => "en",
    }
}

/// Vertical-text debris from the extractor shows up as single characters
/// separated by spaces; drop a block when spaces outnumber half its chars.
pub fn is_garbage(block: &str) -> bool {
    let chars = block.chars().count();
    if chars < 2 {
        return true;
    }
    let spaces = block.chars().filter(|c| *c == ' ').count();
    (spaces as f32) > (chars as f32) / 2.0
}

/// Splits a page into classifiable blocks: trimmed lines, minus short
/// fragments and garbage.
pub fn page_blocks(page_text: &str) -> impl Iterator<Item = &str> {
    page_text
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() >= MIN_BLOCK_CHARS && !is_garbage(line))
}

/// All `*.pdf` files under `root`, recursively, in sorted order so batch
/// runs are reproducible.
pub fn find_pdf_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_blocks_drop_short_and_garbage_lines() {
        let page = "Panduan Keamanan\n42\n  \nP  e  r  h  a  t  i  a  n\nBaca seluruh petunjuk sebelum menggunakan alat.";
        let blocks: Vec<&str> = page_blocks(page).collect();
        assert_eq!(
            blocks,
            vec![
                "Panduan Keamanan",
                "Baca seluruh petunjuk sebelum menggunakan alat.",
            ]
        );
    }

    #[test]
    fn blocks_are_trimmed() {
        let blocks: Vec<&str> = page_blocks("   2.0 Installation   \n").collect();
        assert_eq!(blocks, vec!["2.0 Installation"]);
    }

    #[test]
    fn garbage_detection() {
        assert!(is_garbage(""));
        assert!(is_garbage("x"));
        assert!(is_garbage("a  b  c  d"));
        assert!(!is_garbage("General Inspection"));
        assert!(!is_garbage("normal sentence with spaces"));
    }

    #[test]
    fn detects_english() {
        let pages = vec![
            "This user manual describes the installation, operation and maintenance of the patient monitor.".to_string(),
        ];
        assert_eq!(detect_language(&pages), "en");
    }

    #[test]
    fn detects_indonesian() {
        let pages = vec![
            "Panduan ini menjelaskan cara penggunaan dan pemeliharaan alat kesehatan dengan aman. \
             Jangan gunakan perangkat apabila terdapat kerusakan pada kabel atau baterai karena \
             dapat membahayakan pasien dan pengguna."
                .to_string(),
        ];
        assert_eq!(detect_language(&pages), "id");
    }

    #[test]
    fn empty_pages_fall_back_to_english() {
        assert_eq!(detect_language(&[]), "en");
        assert_eq!(detect_language(&[String::new()]), "en");
    }

    #[test]
    fn find_pdf_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("vendor_b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("b_manual.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("a_manual.PDF"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(nested.join("c_manual.pdf"), b"x").unwrap();

        let files = find_pdf_files(dir.path());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["a_manual.PDF", "b_manual.pdf", "vendor_b/c_manual.pdf"]
        );
    }
}
