//! Backend execution interface.
//!
//! Defines the traits a concrete document-store or relational driver
//! implements, allowing the data-mapping layer to work with any backend.

use crate::error::StorageResult;
use crate::filter::{Filter, FindOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strata_types::{Document, RecordId};

/// Physical shape of one collection/table as far as the backend must know:
/// the constraints it enforces itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    #[serde(default)]
    pub unique_fields: Vec<String>,
    #[serde(default)]
    pub not_null_fields: Vec<String>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_unique(mut self, field: impl Into<String>) -> Self {
        self.unique_fields.push(field.into());
        self
    }

    #[must_use]
    pub fn with_not_null(mut self, field: impl Into<String>) -> Self {
        self.not_null_fields.push(field.into());
        self
    }

    /// Folds another spec's constraints into this one, skipping duplicates.
    /// Used when several logical schemas share one physical store.
    pub fn merge(&mut self, other: &CollectionSpec) {
        for f in &other.unique_fields {
            if !self.unique_fields.contains(f) {
                self.unique_fields.push(f.clone());
            }
        }
        for f in &other.not_null_fields {
            if !self.not_null_fields.contains(f) {
                self.not_null_fields.push(f.clone());
            }
        }
    }
}

/// A storage backend (document store, relational store, ...).
///
/// All methods address a physical collection by name. Documents carry their
/// identity under [`strata_types::ID_FIELD`].
#[async_trait]
pub trait Backend: Send + Sync {
    /// Creates the physical collection, or folds new constraints into an
    /// existing one.
    async fn ensure_collection(&self, spec: &CollectionSpec) -> StorageResult<()>;

    /// Drops the physical collection and all of its documents.
    async fn drop_collection(&self, name: &str) -> StorageResult<()>;

    /// Inserts one document and returns its identity. A backend assigns a
    /// fresh identity when the document carries none.
    async fn insert_one(&self, collection: &str, doc: Document) -> StorageResult<RecordId>;

    /// Returns the first document matching `filter`, honoring sort/offset.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Option<Document>>;

    /// Opens a cursor over all documents matching `filter`.
    ///
    /// The returned handle holds a reserved resource (connection or
    /// equivalent) until [`CursorHandle::release`] is called.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Box<dyn CursorHandle>>;

    /// Writes `patch` onto the document with identity `id` (top-level merge).
    async fn update_one(&self, collection: &str, id: &RecordId, patch: Document) -> StorageResult<()>;

    /// Removes the document with identity `id`. Returns how many documents
    /// were removed.
    async fn delete_one(&self, collection: &str, id: &RecordId) -> StorageResult<u64>;

    /// Counts documents matching `filter`.
    async fn count(&self, collection: &str, filter: &Filter) -> StorageResult<u64>;
}

/// A forward-only streaming cursor holding an exclusive backend resource.
#[async_trait]
pub trait CursorHandle: Send {
    /// Reads up to `n` rows. An empty vector means the cursor is exhausted.
    async fn read(&mut self, n: usize) -> StorageResult<Vec<Document>>;

    /// Returns the reserved resource to the backend.
    ///
    /// Synchronous so it can run from a drop guard on every exit path.
    fn release(&mut self) -> StorageResult<()>;
}
