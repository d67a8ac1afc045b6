use crate::collection::{Collection, CollectionInner};
use crate::error::{OdmError, OdmResult};
use crate::intercept::Suppression;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};
use strata_model::Schema;
use strata_types::{Document, ID_FIELD, OperationContext, RecordId};

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Created in memory, never stored.
    New,
    /// Hydrated from a stored document.
    Loaded,
}

/// Non-owning link back to the collection handle a record came from.
#[derive(Clone)]
struct HandleRef {
    inner: Weak<CollectionInner>,
    suppression: Suppression,
    context: OperationContext,
}

/// A mutable, schema-bound value holder for one entity instance.
///
/// A record never keeps its collection alive; once every handle of the
/// collection is gone, [`Record::insert`] and friends fail with
/// [`OdmError::CollectionDropped`].
#[derive(Clone)]
pub struct Record {
    values: Document,
    changed: BTreeSet<String>,
    state: RecordState,
    schema: Arc<Schema>,
    handle: HandleRef,
}

impl Record {
    fn bound(collection: &Collection, values: Document, state: RecordState) -> Self {
        Self {
            values,
            changed: BTreeSet::new(),
            state,
            schema: Arc::clone(collection.schema()),
            handle: HandleRef {
                inner: Arc::downgrade(collection.inner()),
                suppression: collection.suppression().clone(),
                context: collection.context().clone(),
            },
        }
    }

    /// An empty record with a fresh identity and every declared default.
    pub(crate) fn new(collection: &Collection) -> Self {
        let mut values = Document::new();
        values.insert(ID_FIELD.to_string(), RecordId::new().to_value());
        collection.schema().apply_defaults(&mut values);
        Self::bound(collection, values, RecordState::New)
    }

    /// A record hydrated from a raw stored document.
    pub(crate) fn loaded(collection: &Collection, raw: Document) -> Self {
        let values = collection.schema().hydrate(raw, collection.context());
        Self::bound(collection, values, RecordState::Loaded)
    }

    /// Name of the collection this record belongs to.
    pub fn collection_name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn is_new(&self) -> bool {
        self.state == RecordState::New
    }

    pub fn id(&self) -> Option<RecordId> {
        self.values.get(ID_FIELD).and_then(RecordId::from_value)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Sets `field` and records that it was changed through this record.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let field = field.into();
        self.values.insert(field.clone(), value.into());
        self.changed.insert(field);
        self
    }

    /// Removes a value, returning it.
    pub fn unset(&mut self, field: &str) -> Option<Value> {
        let removed = self.values.remove(field);
        if removed.is_some() {
            self.changed.insert(field.to_string());
        }
        removed
    }

    /// Fields set since the record was created or loaded, sorted.
    pub fn changed_fields(&self) -> Vec<&str> {
        self.changed.iter().map(String::as_str).collect()
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Raw values as stored (or to be stored).
    pub fn values(&self) -> &Document {
        &self.values
    }

    /// Raw values as an owned map.
    pub fn to_object(&self) -> Document {
        self.values.clone()
    }

    /// Presentation form, with every value passed through its field kind.
    pub fn to_json(&self) -> Value {
        Value::Object(self.schema.display(&self.values))
    }

    /// The collection handle this record was created through, with the same
    /// suppression and context.
    pub fn collection(&self) -> OdmResult<Collection> {
        let inner = self
            .handle
            .inner
            .upgrade()
            .ok_or_else(|| OdmError::CollectionDropped(self.schema.name().to_string()))?;
        Ok(Collection::from_parts(
            inner,
            self.handle.suppression.clone(),
            self.handle.context.clone(),
        ))
    }

    /// Inserts this record through its collection. See [`Collection::insert`].
    pub async fn insert(&self) -> OdmResult<Record> {
        self.collection()?.insert(self).await
    }

    /// Writes this record's values through its collection. See
    /// [`Collection::update`].
    pub async fn update(&self) -> OdmResult<Record> {
        self.collection()?.update(self).await
    }

    /// Deletes this record through its collection.
    pub async fn delete(&self) -> OdmResult<u64> {
        self.collection()?.delete(self).await
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("collection", &self.schema.name())
            .field("state", &self.state)
            .field("values", &self.values)
            .finish()
    }
}
