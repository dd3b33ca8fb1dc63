// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to read PDF file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to extract text from PDF: {0}")]
    Parse(String),

    #[error("Document contains no extractable text")]
    Empty,
}

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("Tokenization failed: {0}")]
    Tokenize(String),

    #[error("Embedding inference failed: {0}")]
    Inference(String),
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse schema JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Schema must contain at least one section rule")]
    Empty,

    #[error("Duplicate section id in schema: {0}")]
    DuplicateId(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("PDF extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
