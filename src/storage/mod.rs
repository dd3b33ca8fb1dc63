// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::document::Document;
use crate::report::{MasterSummary, ValidationEntry};
use crate::utils::error::StorageError;

pub const MASTER_SUMMARY_FILE: &str = "master_audit_summary.json";
pub const VALIDATION_REPORT_FILE: &str = "validation_report.json";
const DEBUG_DIR: &str = "debug";

/// Writes and re-reads the JSON artifacts under one output root. Per-document
/// files mirror the input tree; batch reports live at the root.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }

        Ok(Self {
            base_dir: base_path,
        })
    }

    /// Saves one normalized document at the mirrored relative path, swapping
    /// the extension for `.json`.
    pub fn save_document(
        &self,
        document: &Document,
        relative_path: &Path,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(relative_path).with_extension("json");
        self.write_json(&file_path, document)?;
        tracing::info!("Saved document to {}", file_path.display());
        Ok(file_path)
    }

    pub fn save_master_summary(&self, summary: &MasterSummary) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(MASTER_SUMMARY_FILE);
        self.write_json(&file_path, summary)?;
        tracing::info!("Saved master audit summary to {}", file_path.display());
        Ok(file_path)
    }

    pub fn save_validation_report(
        &self,
        entries: &[ValidationEntry],
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(VALIDATION_REPORT_FILE);
        self.write_json(&file_path, &entries)?;
        tracing::info!("Saved validation report to {}", file_path.display());
        Ok(file_path)
    }

    /// Raw per-page extractor text for inspection when `--debug` is set.
    pub fn save_debug_page_text(
        &self,
        relative_path: &Path,
        page: usize,
        text: &str,
    ) -> Result<PathBuf, StorageError> {
        let target_dir = self
            .base_dir
            .join(DEBUG_DIR)
            .join(relative_path.with_extension(""));
        fs::create_dir_all(&target_dir)?;

        let file_path = target_dir.join(format!("page_{:03}.txt", page));
        fs::write(&file_path, text)?;
        Ok(file_path)
    }

    /// Re-reads every per-document JSON under the output root, skipping the
    /// batch reports and debug dumps. Unparseable files are logged and
    /// skipped so a stray file cannot break validation.
    pub fn load_documents(&self) -> Result<Vec<(PathBuf, Document)>, StorageError> {
        let mut documents = Vec::new();

        for entry in WalkDir::new(&self.base_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if path.extension().map(|ext| ext != "json").unwrap_or(true) {
                continue;
            }
            let relative = match path.strip_prefix(&self.base_dir) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            if relative.components().next().map_or(false, |c| {
                c.as_os_str() == DEBUG_DIR
            }) {
                continue;
            }
            let name = relative.to_string_lossy();
            if name == MASTER_SUMMARY_FILE || name == VALIDATION_REPORT_FILE {
                continue;
            }

            let raw = fs::read_to_string(path)?;
            match serde_json::from_str::<Document>(&raw) {
                Ok(document) => documents.push((relative, document)),
                Err(e) => {
                    tracing::warn!("Skipping {}: not a document artifact ({})", name, e);
                }
            }
        }

        documents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(documents)
    }

    fn write_json<T: serde::Serialize>(&self, file_path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(file_path, json)?;
        Ok(())
    }
}
