//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by a storage backend.
///
/// The data-mapping layer propagates these unchanged and never retries.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A unique constraint was violated.
    #[error("duplicate value for unique field '{field}' in '{collection}'")]
    UniqueViolation { collection: String, field: String },

    /// A not-null constraint was violated.
    #[error("null value in not-null field '{field}' of '{collection}'")]
    NotNullViolation { collection: String, field: String },

    /// Document not found.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The target collection/table does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The collection/table already exists with an incompatible shape.
    #[error("collection already exists: {0}")]
    CollectionExists(String),

    /// Connection or transport failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// The document cannot be stored as given (e.g. malformed identity).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The cursor was used after its reserved resource was released.
    #[error("cursor already released")]
    CursorReleased,

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Whether this error reports a uniqueness conflict.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}
