//! Error type shared by every component of the product index.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A vector did not have the store-wide dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A position lookup past the end of the store.
    #[error("Position {position} out of range (count {count})")]
    OutOfRange { position: usize, count: usize },

    /// A vector component or distance was NaN or infinite.
    #[error("Non-finite value: {0}")]
    NonFinite(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Embedder error: {0}")]
    Embedder(String),

    #[error("Product source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic failure reported by the orchestrator. The underlying cause has
    /// already been logged.
    #[error("{operation} failed: {reason}")]
    Operation {
        operation: &'static str,
        reason: String,
    },
}

impl StoreError {
    pub(crate) fn operation(operation: &'static str, cause: StoreError) -> Self {
        StoreError::Operation {
            operation,
            reason: cause.to_string(),
        }
    }
}
