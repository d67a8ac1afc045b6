//! Error types for the data-mapping layer.

use strata_model::{DefinitionError, ModelError, ValidationError};
use strata_storage::StorageError;
use strata_types::{OperationType, OperationWhen};
use thiserror::Error;

/// Result type for odm operations.
pub type OdmResult<T> = Result<T, OdmError>;

/// Everything an odm call can fail with.
///
/// Definition, validation and storage errors pass through unchanged from the
/// layers below; the remaining variants belong to this layer.
#[derive(Debug, Error)]
pub enum OdmError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A hook failed. The remaining chain did not run; storage effects that
    /// completed earlier are not rolled back.
    #[error("interceptor '{name}' failed: {source}")]
    Interceptor {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// A hook returned an empty result for a write.
    #[error("{operation} on '{collection}' cancelled by interceptor '{interceptor}' ({when})")]
    Cancelled {
        collection: String,
        operation: OperationType,
        when: OperationWhen,
        interceptor: String,
    },

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The collection a record was created through no longer exists.
    #[error("collection '{0}' is no longer available")]
    CollectionDropped(String),

    /// Update or delete of a record that was never stored.
    #[error("record of '{0}' has not been persisted")]
    RecordNotPersisted(String),

    #[error("record of '{record}' cannot be written through '{collection}'")]
    WrongCollection { collection: String, record: String },
}

impl OdmError {
    /// Whether the error was raised by the storage backend (including a
    /// uniqueness pre-check hit).
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The aggregate validation error, if that is what this is.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelError> for OdmError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Definition(e) => Self::Definition(e),
            ModelError::Validation(e) => Self::Validation(e),
            ModelError::Storage(e) => Self::Storage(e),
        }
    }
}
