//! Error types for smartspace-flux

use thiserror::Error;

/// Errors that can occur during computation
///
/// Only `InvalidPayload` originates in the signal core (normalize/score/evaluate);
/// the remaining variants belong to the surrounding parsing, storage and encoding
/// layers.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid device payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Document store error: {0}")]
    StoreError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Ingest worker failed: {0}")]
    WorkerError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
