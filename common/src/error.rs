use thiserror::Error;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Extraction error: {0}")]
    Extraction(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("Index not ready: no successful ingestion run has completed")]
    IndexNotReady,
    #[error("Timeout: {operation} exceeded {limit_secs}s")]
    Timeout { operation: String, limit_secs: u64 },
    #[error("Generation service error: {0}")]
    GenerationService(String),
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
}
