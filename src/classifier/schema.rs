// src/classifier/schema.rs

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::SchemaError;

/// A single target chapter of the normalized manual: the internal id plus
/// the matching rules used by the heading classifier.
///
/// Keywords trigger a hard match when any of them appears (case-insensitive)
/// inside a text block. The exclude list vetoes a *semantic* candidate when
/// any entry appears in the block; it never suppresses a hard match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRule {
    pub id: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl SectionRule {
    fn new(id: &str, keywords: &[&str], exclude: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Text handed to the embedding model for this section: the id combined
    /// with every keyword, so the label vector carries more signal than the
    /// bare chapter name.
    pub fn rich_description(&self) -> String {
        format!("{} {}", self.id, self.keywords.join(" "))
    }

    /// True if any keyword is a case-insensitive substring of `block`.
    pub fn keyword_matches(&self, block: &str) -> bool {
        let lowered = block.to_lowercase();
        self.keywords.iter().any(|kw| lowered.contains(&kw.to_lowercase()))
    }

    /// True if any exclude entry is a case-insensitive substring of `block`.
    pub fn excludes(&self, block: &str) -> bool {
        let lowered = block.to_lowercase();
        self.exclude.iter().any(|ex| lowered.contains(&ex.to_lowercase()))
    }
}

/// The fixed catalog of target chapters, kept as an explicit ordered list so
/// that first-match-wins behavior does not depend on incidental map ordering.
/// Constructed once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Schema {
    rules: Vec<SectionRule>,
}

impl Schema {
    pub fn new(rules: Vec<SectionRule>) -> Result<Self, SchemaError> {
        if rules.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.clone()) {
                return Err(SchemaError::DuplicateId(rule.id.clone()));
            }
        }
        Ok(Self { rules })
    }

    /// Loads a user-supplied schema: a JSON array of section rules in match
    /// priority order.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let raw = std::fs::read_to_string(path)?;
        let rules: Vec<SectionRule> = serde_json::from_str(&raw)?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &[SectionRule] {
        &self.rules
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.id.as_str())
    }

    /// True if `line` contains any keyword of any rule. Used by keyword
    /// discovery to skip lines the schema already covers.
    pub fn any_keyword_covers(&self, line: &str) -> bool {
        self.rules.iter().any(|r| r.keyword_matches(line))
    }

    /// The built-in chapter catalog for medical-device manuals. Keywords are
    /// bilingual (Indonesian/English) because the source corpus mixes both.
    pub fn builtin() -> Self {
        let rules = vec![
            SectionRule::new(
                "1.1 Intended Use/Definition",
                &["tujuan produk", "definisi", "intended use", "intended purpose"],
                &[],
            ),
            SectionRule::new(
                "1.2 Safety Guidelines",
                &["panduan keamanan", "safety guidelines", "warning", "caution", "peringatan", "bahaya"],
                &[],
            ),
            SectionRule::new(
                "1.3 Explanation of Symbols",
                &["penjelasan simbol", "simbol", "explanation of symbols", "arti simbol"],
                &[],
            ),
            SectionRule::new(
                "1.4 Abbreviations",
                &["singkatan", "abbreviations", "daftar singkatan"],
                // Roman page numbers and warranty headings score close to this
                // label but belong elsewhere.
                &["XIII", "XII", "XI", "Garansi", "Warranty", "Bab"],
            ),
            SectionRule::new(
                "2.0 Installation",
                &["instalasi", "pemasangan", "installation", "setup", "unboxing"],
                &[],
            ),
            SectionRule::new(
                "3.1 User Interface",
                &["antarmuka pengguna", "user interface", "display", "tampilan", "layar", "tombol"],
                &[],
            ),
            SectionRule::new(
                "3.2 Overview",
                &["overview", "gambaran umum", "product overview", "accessories", "aksesoris", "controls"],
                &["spesifikasi", "specification"],
            ),
            SectionRule::new(
                "3.3 User Management",
                &["manajemen pengguna", "data pengguna", "patient record", "user management", "data pasien"],
                &[],
            ),
            SectionRule::new(
                "3.4 Monitoring Procedure",
                &["prosedur pemantauan", "monitoring procedure", "langkah pemantauan", "cara mengukur"],
                &[],
            ),
            SectionRule::new(
                "3.5 Medical Calculation",
                &["medical calculation", "perhitungan medis", "kalkulasi dosis"],
                &[],
            ),
            SectionRule::new(
                "3.6 Record Management & Review",
                &["manajemen rekaman", "tinjauan hasil", "historical data", "logbook"],
                &[],
            ),
            SectionRule::new(
                "4.1 General Inspection",
                &["inspeksi umum", "general inspection", "pemeriksaan fisik"],
                &["Untuk memulai pengukuran manual", "Langkah-langkah pengukuran", "Instruksi pengukuran"],
            ),
            SectionRule::new(
                "4.2 Maintenance",
                &["maintenance", "pemeliharaan", "kalibrasi", "pengecekan teknis", "servis berkala", "penggantian suku cadang"],
                &["penyimpanan", "cara membawa", "care of device"],
            ),
            SectionRule::new(
                "4.3 Care",
                &["perawatan", "care of device", "penyimpanan", "storage", "penanganan alat", "cara menjaga"],
                &["kalibrasi", "servis", "suku cadang", "technical check"],
            ),
            SectionRule::new(
                "4.4 Cleaning",
                &["pembersihan", "cleaning", "disinfection", "sterilisasi"],
                &[],
            ),
            SectionRule::new(
                "5.0 Troubleshooting",
                &["pemecahan masalah", "troubleshooting", "error codes", "solusi masalah"],
                &[],
            ),
            SectionRule::new(
                "6.1 Specification",
                &["spesifikasi", "specification", "technical data", "berat", "dimensi", "daya"],
                &["accessories", "aksesoris", "1.5"],
            ),
            SectionRule::new(
                "6.2 Standard Compliance",
                &["IEC", "EMC", "ISO", "standar kepatuhan", "standard compliance"],
                &[],
            ),
            SectionRule::new(
                "7.1 Warranty",
                &["garansi", "warranty", "purna jual"],
                &["IEC", "EMC", "ISO"],
            ),
            SectionRule::new(
                "7.2 Contact Information",
                &["informasi kontak", "service contact", "layanan pelanggan", "telepon", "alamat"],
                &[],
            ),
        ];
        // The built-in catalog is statically known to be valid.
        Self { rules }
    }
}

/// Per-language display names for section ids. Lookup falls back to the
/// internal id when the detected language has no entry.
#[derive(Debug, Clone)]
pub struct Translations {
    map: HashMap<String, HashMap<String, String>>,
}

impl Translations {
    pub fn empty() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn insert(&mut self, section_id: &str, lang_code: &str, display: &str) {
        self.map
            .entry(section_id.to_string())
            .or_default()
            .insert(lang_code.to_string(), display.to_string());
    }

    pub fn display_name(&self, section_id: &str, lang_code: &str) -> String {
        self.map
            .get(section_id)
            .and_then(|by_lang| by_lang.get(lang_code))
            .cloned()
            .unwrap_or_else(|| section_id.to_string())
    }

    /// Indonesian display names for the built-in schema. English output uses
    /// the internal ids directly via the fallback.
    pub fn builtin() -> Self {
        let pairs = [
            ("1.1 Intended Use/Definition", "1.1 Tujuan Produk/Definisi"),
            ("1.2 Safety Guidelines", "1.2 Panduan Keamanan"),
            ("1.3 Explanation of Symbols", "1.3 Penjelasan Simbol"),
            ("1.4 Abbreviations", "1.4 Singkatan"),
            ("2.0 Installation", "2.0 Instalasi"),
            ("3.1 User Interface", "3.1 Antarmuka Pengguna"),
            ("3.2 Overview", "3.2 Overview"),
            ("3.3 User Management", "3.3 Manajemen Pengguna"),
            ("3.4 Monitoring Procedure", "3.4 Prosedur Pemantauan"),
            ("3.5 Medical Calculation", "3.5 Perhitungan Medis"),
            ("3.6 Record Management & Review", "3.6 Manajemen Rekaman & Tinjauan Hasil"),
            ("4.1 General Inspection", "4.1 Inspeksi Umum"),
            ("4.2 Maintenance", "4.2 Pemeliharaan"),
            ("4.3 Care", "4.3 Perawatan"),
            ("4.4 Cleaning", "4.4 Pembersihan"),
            ("5.0 Troubleshooting", "5.0 Pemecahan Masalah"),
            ("6.1 Specification", "6.1 Spesifikasi"),
            ("6.2 Standard Compliance", "6.2 Kepatuhan Standar"),
            ("7.1 Warranty", "7.1 Garansi"),
            ("7.2 Contact Information", "7.2 Informasi Kontak"),
        ];
        let mut translations = Self::empty();
        for (id, indonesian) in pairs {
            translations.insert(id, "id", indonesian);
        }
        translations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_schema_is_ordered_and_valid() {
        let schema = Schema::builtin();
        assert_eq!(schema.rules().len(), 20);
        assert_eq!(schema.rules()[0].id, "1.1 Intended Use/Definition");
        assert_eq!(schema.rules()[19].id, "7.2 Contact Information");
        // Re-validating the built-in catalog through the public constructor
        // must succeed.
        assert!(Schema::new(schema.rules().to_vec()).is_ok());
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let rule = SectionRule::new("A", &["warranty"], &[]);
        assert!(rule.keyword_matches("7.1 WARRANTY TERMS"));
        assert!(rule.keyword_matches("limited warranty applies"));
        assert!(!rule.keyword_matches("contact information"));
    }

    #[test]
    fn exclude_match_is_case_insensitive_substring() {
        let rule = SectionRule::new("A", &[], &["IEC"]);
        assert!(rule.excludes("complies with iec 60601"));
        assert!(!rule.excludes("warranty card"));
    }

    #[test]
    fn empty_schema_is_rejected() {
        assert!(matches!(Schema::new(vec![]), Err(SchemaError::Empty)));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let rules = vec![
            SectionRule::new("A", &["x"], &[]),
            SectionRule::new("A", &["y"], &[]),
        ];
        assert!(matches!(
            Schema::new(rules),
            Err(SchemaError::DuplicateId(id)) if id == "A"
        ));
    }

    #[test]
    fn schema_loads_from_json_file() {
        let json = r#"[
            {"id": "A", "keywords": ["foo"], "exclude": ["bar"]},
            {"id": "B", "keywords": ["baz"]}
        ]"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let schema = Schema::from_json_file(file.path()).unwrap();
        assert_eq!(schema.rules().len(), 2);
        assert_eq!(schema.rules()[0].id, "A");
        assert_eq!(schema.rules()[0].exclude, vec!["bar".to_string()]);
        // exclude is optional in the file format
        assert!(schema.rules()[1].exclude.is_empty());
    }

    #[test]
    fn translations_fall_back_to_internal_id() {
        let translations = Translations::builtin();
        assert_eq!(
            translations.display_name("7.1 Warranty", "id"),
            "7.1 Garansi"
        );
        assert_eq!(
            translations.display_name("7.1 Warranty", "en"),
            "7.1 Warranty"
        );
        assert_eq!(translations.display_name("unknown id", "id"), "unknown id");
    }
}
