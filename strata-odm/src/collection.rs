//! The collection façade: CRUD and filter-based reads for one schema.

use crate::config::OdmConfig;
use crate::error::{OdmError, OdmResult};
use crate::intercept::{Interception, InterceptorRegistry, Suppression};
use crate::query::Query;
use crate::record::Record;
use serde_json::Value;
use std::sync::Arc;
use strata_model::{FieldViolation, Schema, ValidationContext, ValidationError, ViolationKind};
use strata_storage::{Backend, Filter, StorageError};
use strata_types::{
    DISCRIMINATOR_FIELD, Document, ID_FIELD, OperationContext, OperationType, OperationWhen,
    RecordId,
};
use tracing::debug;

/// State shared by every handle of one collection.
pub(crate) struct CollectionInner {
    pub(crate) schema: Arc<Schema>,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) interceptors: Arc<InterceptorRegistry>,
    pub(crate) config: Arc<OdmConfig>,
}

/// How [`Collection::get_record`] finds a record.
#[derive(Debug, Clone)]
pub enum RecordLookup {
    Id(RecordId),
    Field(String, Value),
    Filter(Filter),
}

impl From<RecordId> for RecordLookup {
    fn from(id: RecordId) -> Self {
        Self::Id(id)
    }
}

impl From<&RecordId> for RecordLookup {
    fn from(id: &RecordId) -> Self {
        Self::Id(*id)
    }
}

impl From<Filter> for RecordLookup {
    fn from(filter: Filter) -> Self {
        Self::Filter(filter)
    }
}

impl<V: Into<Value>> From<(&str, V)> for RecordLookup {
    fn from((field, value): (&str, V)) -> Self {
        Self::Field(field.to_string(), value.into())
    }
}

/// A live handle for one logical schema.
///
/// Handles are cheap to clone. [`deactivate_intercept`], [`disable_intercepts`]
/// and [`with_context`] return a new handle and leave this one untouched, so
/// concurrent calls through different handles never affect each other.
///
/// Subtypes persist into the store of their root ancestor (the host) and are
/// told apart by the [`DISCRIMINATOR_FIELD`]. Queries through a subtype only
/// see that subtype; queries through the root see every record in the host.
///
/// [`deactivate_intercept`]: Collection::deactivate_intercept
/// [`disable_intercepts`]: Collection::disable_intercepts
/// [`with_context`]: Collection::with_context
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
    suppression: Suppression,
    context: OperationContext,
}

impl Collection {
    pub(crate) fn new(inner: CollectionInner) -> Self {
        Self::from_parts(Arc::new(inner), Suppression::None, OperationContext::new())
    }

    pub(crate) fn from_parts(
        inner: Arc<CollectionInner>,
        suppression: Suppression,
        context: OperationContext,
    ) -> Self {
        Self {
            inner,
            suppression,
            context,
        }
    }

    pub(crate) fn inner(&self) -> &Arc<CollectionInner> {
        &self.inner
    }

    pub(crate) fn backend(&self) -> &dyn Backend {
        self.inner.backend.as_ref()
    }

    pub(crate) fn config(&self) -> &OdmConfig {
        &self.inner.config
    }

    pub fn name(&self) -> &str {
        self.inner.schema.name()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    /// Physical store this collection reads from and writes to.
    pub fn host_name(&self) -> &str {
        self.inner.schema.host_name()
    }

    pub fn suppression(&self) -> &Suppression {
        &self.suppression
    }

    pub fn context(&self) -> &OperationContext {
        &self.context
    }

    // ── Handles ──────────────────────────────────────────────────

    /// A handle that skips the interceptor called `name`, in both phases.
    #[must_use]
    pub fn deactivate_intercept(&self, name: impl Into<String>) -> Self {
        Self::from_parts(
            Arc::clone(&self.inner),
            self.suppression.clone().with_name(name),
            self.context.clone(),
        )
    }

    /// A handle that skips every interceptor.
    #[must_use]
    pub fn disable_intercepts(&self) -> Self {
        Self::from_parts(Arc::clone(&self.inner), Suppression::All, self.context.clone())
    }

    /// A handle whose operations hand `context` to interceptors and field kinds.
    #[must_use]
    pub fn with_context(&self, context: OperationContext) -> Self {
        Self::from_parts(Arc::clone(&self.inner), self.suppression.clone(), context)
    }

    /// An empty record bound to this handle, with a fresh identity and
    /// declared defaults.
    pub fn create_new_record(&self) -> Record {
        Record::new(self)
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Normalizes a caller filter: scalar values of known fields pass through
    /// their field kind, and subtypes gain the discriminator constraint.
    pub fn format_filter(&self, mut filter: Filter) -> Filter {
        let schema = &self.inner.schema;
        for (field, value) in filter.iter_mut() {
            let taken = std::mem::take(value);
            *value = schema.intercept_value(field, taken, &self.context);
        }
        if let Some(discriminator) = schema.discriminator() {
            filter.insert(DISCRIMINATOR_FIELD, discriminator);
        }
        filter
    }

    /// A lazily executed query over records matching `filter`.
    pub fn find(&self, filter: Filter) -> Query {
        Query::new(self.clone(), filter)
    }

    pub async fn find_one(&self, filter: Filter) -> OdmResult<Option<Record>> {
        self.find(filter).first().await
    }

    pub async fn find_by_id(&self, id: &RecordId) -> OdmResult<Option<Record>> {
        self.find_one(Filter::new().with(ID_FIELD, id.to_value())).await
    }

    /// Finds one record by identity, by a single field value, or by filter.
    pub async fn get_record(&self, lookup: impl Into<RecordLookup>) -> OdmResult<Option<Record>> {
        match lookup.into() {
            RecordLookup::Id(id) => self.find_by_id(&id).await,
            RecordLookup::Field(field, value) => self.find_one(Filter::new().with(field, value)).await,
            RecordLookup::Filter(filter) => self.find_one(filter).await,
        }
    }

    pub async fn count(&self, filter: Filter) -> OdmResult<u64> {
        self.find(filter).count().await
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Inserts `record` and returns the stored, fully hydrated version.
    ///
    /// CREATE/BEFORE may rewrite the record (or cancel the insert), the
    /// result is validated as a whole, written, re-fetched and passed
    /// through CREATE/AFTER.
    pub async fn insert(&self, record: &Record) -> OdmResult<Record> {
        self.insert_many(vec![record.clone()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OdmError::RecordNotPersisted(self.name().to_string()))
    }

    /// Inserts several records. Every record is validated before the first
    /// one is written.
    pub async fn insert_many(&self, records: Vec<Record>) -> OdmResult<Vec<Record>> {
        for record in &records {
            self.ensure_owned(record)?;
        }
        let records = self
            .intercept_write(OperationType::Create, OperationWhen::Before, records)
            .await?;

        let mut prepared = Vec::with_capacity(records.len());
        for record in &records {
            self.ensure_owned(record)?;
            let (id, doc) = self.prepare_insert(record)?;
            self.validate(&doc, None).await?;
            prepared.push((id, doc));
        }

        let mut stored = Vec::with_capacity(prepared.len());
        for (id, doc) in prepared {
            self.log_query("insert_one", || format!("id={id}"));
            let id = self.backend().insert_one(self.host_name(), doc).await?;
            stored.push(self.refetch(&id).await?);
        }

        self.intercept_write(OperationType::Create, OperationWhen::After, stored)
            .await
    }

    /// Writes every current value of `record` to storage (a top-level merge
    /// onto the stored document, not a diff) and returns the stored version.
    pub async fn update(&self, record: &Record) -> OdmResult<Record> {
        self.ensure_owned(record)?;
        self.ensure_persisted(record)?;
        let records = self
            .intercept_write(OperationType::Update, OperationWhen::Before, vec![record.clone()])
            .await?;

        let mut prepared = Vec::with_capacity(records.len());
        for record in &records {
            self.ensure_owned(record)?;
            let id = self.ensure_persisted(record)?;
            let mut doc = self.prepare(record);
            doc.remove(ID_FIELD);
            self.validate(&doc, Some(id)).await?;
            prepared.push((id, doc));
        }

        let mut stored = Vec::with_capacity(prepared.len());
        for (id, doc) in prepared {
            self.log_query("update_one", || format!("id={id}"));
            self.backend().update_one(self.host_name(), &id, doc).await?;
            stored.push(self.refetch(&id).await?);
        }

        self.intercept_write(OperationType::Update, OperationWhen::After, stored)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OdmError::RecordNotPersisted(self.name().to_string()))
    }

    /// Removes `record` by identity. Returns how many stored documents were
    /// removed.
    pub async fn delete(&self, record: &Record) -> OdmResult<u64> {
        self.ensure_owned(record)?;
        self.ensure_persisted(record)?;
        let records = self
            .intercept_write(OperationType::Delete, OperationWhen::Before, vec![record.clone()])
            .await?;

        for record in &records {
            self.ensure_owned(record)?;
            self.ensure_persisted(record)?;
        }
        let mut removed = 0;
        for record in &records {
            let id = self.ensure_persisted(record)?;
            self.log_query("delete_one", || format!("id={id}"));
            removed += self.backend().delete_one(self.host_name(), &id).await?;
        }

        self.intercept_write(OperationType::Delete, OperationWhen::After, records)
            .await?;
        Ok(removed)
    }

    // ── Internals ────────────────────────────────────────────────

    pub(crate) async fn intercept(
        &self,
        operation: OperationType,
        when: OperationWhen,
        records: Vec<Record>,
    ) -> OdmResult<Interception> {
        self.inner
            .interceptors
            .run(self.name(), operation, when, records, &self.context, &self.suppression)
            .await
    }

    /// Runs a phase of a write; a halt cancels the operation.
    async fn intercept_write(
        &self,
        operation: OperationType,
        when: OperationWhen,
        records: Vec<Record>,
    ) -> OdmResult<Vec<Record>> {
        match self.intercept(operation, when, records).await? {
            Interception::Continue(records) => Ok(records),
            Interception::Halted { by } => Err(OdmError::Cancelled {
                collection: self.name().to_string(),
                operation,
                when,
                interceptor: by,
            }),
        }
    }

    /// SELECT/BEFORE. Returns `false` when a hook halted the read.
    pub(crate) async fn select_before(&self) -> OdmResult<bool> {
        match self
            .intercept(OperationType::Select, OperationWhen::Before, Vec::new())
            .await?
        {
            Interception::Continue(_) => Ok(true),
            Interception::Halted { .. } => Ok(false),
        }
    }

    /// SELECT/AFTER for one fetched record. A halt drops the record.
    pub(crate) async fn select_after(&self, record: Record) -> OdmResult<Vec<Record>> {
        match self
            .intercept(OperationType::Select, OperationWhen::After, vec![record])
            .await?
        {
            Interception::Continue(records) => Ok(records),
            Interception::Halted { .. } => Ok(Vec::new()),
        }
    }

    fn ensure_owned(&self, record: &Record) -> OdmResult<()> {
        if record.collection_name() != self.name() {
            return Err(OdmError::WrongCollection {
                collection: self.name().to_string(),
                record: record.collection_name().to_string(),
            });
        }
        Ok(())
    }

    fn ensure_persisted(&self, record: &Record) -> OdmResult<RecordId> {
        match record.id() {
            Some(id) if !record.is_new() => Ok(id),
            _ => Err(OdmError::RecordNotPersisted(self.name().to_string())),
        }
    }

    /// The write payload of `record`: values normalized by their field kind,
    /// stamped with the discriminator for subtypes.
    fn prepare(&self, record: &Record) -> Document {
        let mut doc = record.to_object();
        self.inner.schema.intercept_document(&mut doc, &self.context);
        if let Some(discriminator) = self.inner.schema.discriminator() {
            doc.insert(DISCRIMINATOR_FIELD.to_string(), discriminator.into());
        }
        doc
    }

    fn prepare_insert(&self, record: &Record) -> OdmResult<(RecordId, Document)> {
        let mut doc = self.prepare(record);
        self.inner.schema.apply_defaults(&mut doc);
        let id = match doc.get(ID_FIELD).filter(|v| !v.is_null()) {
            None => RecordId::new(),
            Some(value) => RecordId::from_value(value).ok_or_else(|| self.invalid_identity())?,
        };
        doc.insert(ID_FIELD.to_string(), id.to_value());
        Ok((id, doc))
    }

    fn invalid_identity(&self) -> OdmError {
        let kind = ViolationKind::NotValidValue;
        ValidationError {
            schema: self.name().to_string(),
            violations: vec![FieldViolation {
                field: ID_FIELD.to_string(),
                kind,
                message: kind.message(ID_FIELD, "uuid"),
            }],
        }
        .into()
    }

    async fn validate(&self, doc: &Document, record_id: Option<RecordId>) -> OdmResult<()> {
        let ctx = ValidationContext::new(self.backend(), self.host_name(), record_id, &self.context);
        self.inner.schema.validate(doc, &ctx).await?;
        Ok(())
    }

    async fn refetch(&self, id: &RecordId) -> OdmResult<Record> {
        let filter = Filter::new().with(ID_FIELD, id.to_value());
        self.log_query("find_one", || format!("id={id}"));
        let raw = self
            .backend()
            .find_one(self.host_name(), &filter, &Default::default())
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        Ok(Record::loaded(self, raw))
    }

    pub(crate) fn log_query(&self, action: &str, detail: impl FnOnce() -> String) {
        if self.inner.config.log_queries {
            debug!(collection = self.name(), host = self.host_name(), action, detail = %detail(), "storage call");
        }
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name())
            .field("host", &self.host_name())
            .field("suppression", &self.suppression)
            .finish()
    }
}
