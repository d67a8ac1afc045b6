#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use strata_odm::{
    Backend, Collection, FieldDefinition, Filter, FindOptions, MemoryBackend, Odm,
    OperationContext, OperationType, OperationWhen, Record, RecordId, SchemaDefinition,
};
use strata_storage::{CollectionSpec, CursorHandle, StorageResult};
use strata_types::Document;

/// Shared log of `name:OPERATION:WHEN` entries, in call order.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Names only, in call order.
    pub fn names(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .map(|e| e.split(':').next().unwrap_or_default().to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

type HookFn = dyn Fn(OperationType, OperationWhen, Vec<Record>, &OperationContext) -> anyhow::Result<Option<Vec<Record>>>
    + Send
    + Sync;

/// A closure-backed interceptor that logs every invocation.
pub struct Hook {
    name: String,
    order: i32,
    log: CallLog,
    f: Box<HookFn>,
}

impl Hook {
    pub fn new(
        name: &str,
        order: i32,
        log: &CallLog,
        f: impl Fn(OperationType, OperationWhen, Vec<Record>, &OperationContext) -> anyhow::Result<Option<Vec<Record>>>
        + Send
        + Sync
        + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            order,
            log: log.clone(),
            f: Box::new(f),
        })
    }

    /// Logs and passes records through unchanged.
    pub fn pass(name: &str, order: i32, log: &CallLog) -> Arc<Self> {
        Self::new(name, order, log, |_, _, records, _| Ok(Some(records)))
    }
}

#[async_trait]
impl strata_odm::Interceptor for Hook {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.order
    }

    async fn intercept(
        &self,
        _collection: &str,
        operation: OperationType,
        when: OperationWhen,
        records: Vec<Record>,
        context: &OperationContext,
    ) -> anyhow::Result<Option<Vec<Record>>> {
        self.log.push(format!("{}:{}:{}", self.name, operation, when));
        (self.f)(operation, when, records, context)
    }
}

pub fn setup() -> (Arc<MemoryBackend>, Odm) {
    let backend = Arc::new(MemoryBackend::new());
    let odm = Odm::new(backend.clone());
    (backend, odm)
}

pub fn employee_definition() -> SchemaDefinition {
    SchemaDefinition::new("employee")
        .field(FieldDefinition::string("name").unique())
        .field(FieldDefinition::integer("salary").not_null())
}

pub async fn employees(odm: &Odm) -> Collection {
    odm.define_collection(employee_definition()).await.unwrap()
}

/// Inserts one employee through `collection`, bypassing nothing.
pub async fn hire(collection: &Collection, name: &str, salary: i64) -> Record {
    let mut record = collection.create_new_record();
    record.set("name", name).set("salary", salary);
    collection.insert(&record).await.unwrap()
}

/// Delegates to a [`MemoryBackend`] but yields to the scheduler before
/// preparing a store, so concurrent definitions interleave there.
pub struct YieldingBackend(pub Arc<MemoryBackend>);

#[async_trait]
impl Backend for YieldingBackend {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> StorageResult<()> {
        tokio::task::yield_now().await;
        self.0.ensure_collection(spec).await
    }

    async fn drop_collection(&self, name: &str) -> StorageResult<()> {
        self.0.drop_collection(name).await
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> StorageResult<RecordId> {
        self.0.insert_one(collection, doc).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Option<Document>> {
        self.0.find_one(collection, filter, options).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Box<dyn CursorHandle>> {
        self.0.find(collection, filter, options).await
    }

    async fn update_one(&self, collection: &str, id: &RecordId, patch: Document) -> StorageResult<()> {
        self.0.update_one(collection, id, patch).await
    }

    async fn delete_one(&self, collection: &str, id: &RecordId) -> StorageResult<u64> {
        self.0.delete_one(collection, id).await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StorageResult<u64> {
        self.0.count(collection, filter).await
    }
}
