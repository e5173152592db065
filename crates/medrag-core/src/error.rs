use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy of the retrieval pipeline.
///
/// Only `IndexNotReady` is meant to reach the process boundary; the loader
/// logs and skips `MissingInput`/`SchemaMismatch`, and the answer path maps
/// `ModelUnavailable` to a fallback message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing input {}: {reason}", path.display())]
    MissingInput { path: PathBuf, reason: String },

    #[error("Schema mismatch in {}: expected columns {expected}", path.display())]
    SchemaMismatch { path: PathBuf, expected: String },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Vector index queried before it was built or loaded")]
    IndexNotReady,

    #[error("Index storage failed: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
