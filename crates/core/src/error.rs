//! Error types for Recall.
//!
//! One enum covers configuration, I/O, LLM, storage and index errors. The
//! index-specific variants follow the retrieval error taxonomy: a missing
//! bundle is `NotFound`, a length mismatch is `CorruptBundle`, a failed
//! embedding or classifier call is `BackendUnavailable` and a bad ordinal
//! selection is `MalformedSelection`.

use thiserror::Error;

/// Unified error type for Recall.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// A blob or bundle does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisted bundle violates the vector/item alignment
    #[error("Corrupt bundle: {0}")]
    CorruptBundle(String),

    /// Embedding backend, summarizer or classifier call failed
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Selection index does not address the pending result slot
    #[error("Malformed selection: {0}")]
    MalformedSelection(String),

    /// Blob store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether callers may continue after this error with degraded output.
    ///
    /// `NotFound` is the normal first-use state of a collection and
    /// `MalformedSelection` only resets the pending result slot.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::NotFound(_) | AppError::MalformedSelection(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
