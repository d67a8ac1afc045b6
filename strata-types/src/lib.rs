//! Core type definitions for strata.
//!
//! This crate defines the small, backend-agnostic vocabulary shared by every
//! other strata crate:
//! - Record identifiers (UUID v7)
//! - The raw [`Document`] shape exchanged with storage backends
//! - Operation tags and phases used by the interceptor pipeline
//! - The per-handle [`OperationContext`] bag handed to hooks and field kinds
//!
//! Schema-specific types (field kinds, definitions, records) live in
//! `strata-model` and `strata-odm`, not here.

mod ids;
mod operation;

pub use ids::RecordId;
pub use operation::{OperationContext, OperationType, OperationWhen};

/// Raw key/value payload of one persisted document or row.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Name of the implicit identity field injected into every root schema.
pub const ID_FIELD: &str = "id";

/// Name of the hidden field distinguishing subtypes that share one host store.
pub const DISCRIMINATOR_FIELD: &str = "_collection";

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}
