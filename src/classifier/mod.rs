// src/classifier/mod.rs
pub mod embedding;
pub mod heading;
pub mod schema;

// Re-export key classification types for convenience
pub use embedding::{cosine_similarity, EmbeddingProvider, OnnxEmbedder};
pub use heading::{ClassificationResult, ClassifierConfig, HeadingClassifier, MatchKind};
pub use schema::{Schema, SectionRule, Translations};
