//! In-memory backend.
//!
//! A complete [`Backend`] over plain vectors, used by the test suites and as
//! a reference for driver authors. It enforces the unique/not-null
//! constraints of each [`CollectionSpec`] the way a real store would, counts
//! every round-trip, and tracks reserved cursor resources so tests can
//! assert that each one is released exactly once.

use crate::backend::{Backend, CollectionSpec, CursorHandle};
use crate::error::{StorageError, StorageResult};
use crate::filter::{Filter, FindOptions};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use strata_types::{Document, ID_FIELD, RecordId};
use tokio::sync::RwLock;
use tracing::debug;

const NO_FAILURE: usize = usize::MAX;

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicU64,
    cursors_opened: AtomicU64,
    cursors_released: AtomicU64,
}

#[derive(Debug, Default)]
struct MemoryTable {
    spec: CollectionSpec,
    rows: Vec<Document>,
}

impl MemoryTable {
    fn position(&self, id: &RecordId) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get(ID_FIELD).and_then(RecordId::from_value).as_ref() == Some(id))
    }

    /// Checks `doc` against the table constraints, ignoring the row at `skip`.
    fn check(&self, doc: &Document, skip: Option<usize>) -> StorageResult<()> {
        for field in &self.spec.not_null_fields {
            if doc.get(field).is_none_or(Value::is_null) {
                return Err(StorageError::NotNullViolation {
                    collection: self.spec.name.clone(),
                    field: field.clone(),
                });
            }
        }

        let unique = std::iter::once(ID_FIELD).chain(self.spec.unique_fields.iter().map(String::as_str));
        for field in unique {
            let Some(value) = doc.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = self
                .rows
                .iter()
                .enumerate()
                .any(|(i, row)| Some(i) != skip && row.get(field) == Some(value));
            if clash {
                return Err(StorageError::UniqueViolation {
                    collection: self.spec.name.clone(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    fn select(&self, filter: &Filter, options: &FindOptions) -> Vec<Document> {
        let mut rows: Vec<Document> = self
            .rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        if !options.sort.is_empty() {
            rows.sort_by(|a, b| options.compare(a, b));
        }
        let offset = options.offset.unwrap_or(0);
        let limit = options.limit.unwrap_or(usize::MAX);
        rows.into_iter().skip(offset).take(limit).collect()
    }
}

/// An in-process backend storing documents in insertion order.
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, MemoryTable>>,
    counters: Arc<Counters>,
    fail_reads_after: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            counters: Arc::new(Counters::default()),
            fail_reads_after: AtomicUsize::new(NO_FAILURE),
        }
    }

    /// Total number of backend round-trips made so far.
    pub fn calls(&self) -> u64 {
        self.counters.calls.load(Ordering::SeqCst)
    }

    /// Number of cursors handed out by [`Backend::find`].
    pub fn cursors_opened(&self) -> u64 {
        self.counters.cursors_opened.load(Ordering::SeqCst)
    }

    /// Number of cursors whose reserved resource was returned.
    pub fn cursors_released(&self) -> u64 {
        self.counters.cursors_released.load(Ordering::SeqCst)
    }

    /// Cursors currently holding a reserved resource.
    pub fn open_cursors(&self) -> u64 {
        self.cursors_opened().saturating_sub(self.cursors_released())
    }

    /// Makes every cursor opened from now on fail with a connection error
    /// once it has delivered `rows` rows, simulating a dropped connection.
    pub fn fail_reads_after(&self, rows: usize) {
        self.fail_reads_after.store(rows, Ordering::SeqCst);
    }

    pub fn clear_read_failure(&self) {
        self.fail_reads_after.store(NO_FAILURE, Ordering::SeqCst);
    }

    /// Snapshot of a collection's documents in insertion order.
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        let tables = self.tables.read().await;
        tables.get(collection).map(|t| t.rows.clone()).unwrap_or_default()
    }

    /// Constraints currently enforced on a collection.
    pub async fn spec(&self, collection: &str) -> Option<CollectionSpec> {
        let tables = self.tables.read().await;
        tables.get(collection).map(|t| t.spec.clone())
    }

    fn tick(&self) {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn missing(collection: &str) -> StorageError {
    StorageError::CollectionNotFound(collection.to_string())
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> StorageResult<()> {
        self.tick();
        let mut tables = self.tables.write().await;
        match tables.get_mut(&spec.name) {
            Some(table) => table.spec.merge(spec),
            None => {
                debug!(collection = %spec.name, "creating in-memory collection");
                tables.insert(
                    spec.name.clone(),
                    MemoryTable {
                        spec: spec.clone(),
                        rows: Vec::new(),
                    },
                );
            }
        }
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> StorageResult<()> {
        self.tick();
        let mut tables = self.tables.write().await;
        tables.remove(name).map(|_| ()).ok_or_else(|| missing(name))
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> StorageResult<RecordId> {
        self.tick();
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(collection).ok_or_else(|| missing(collection))?;

        let id = match doc.get(ID_FIELD) {
            None | Some(Value::Null) => RecordId::new(),
            Some(value) => RecordId::from_value(value).ok_or_else(|| {
                StorageError::InvalidDocument(format!("'{ID_FIELD}' is not a UUID: {value}"))
            })?,
        };
        doc.insert(ID_FIELD.to_string(), id.to_value());

        table.check(&doc, None)?;
        table.rows.push(doc);
        Ok(id)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Option<Document>> {
        self.tick();
        let tables = self.tables.read().await;
        let table = tables.get(collection).ok_or_else(|| missing(collection))?;
        Ok(table.select(filter, &options.clone().limit(1)).into_iter().next())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Box<dyn CursorHandle>> {
        self.tick();
        let tables = self.tables.read().await;
        let table = tables.get(collection).ok_or_else(|| missing(collection))?;
        let rows = table.select(filter, options);
        self.counters.cursors_opened.fetch_add(1, Ordering::SeqCst);

        let fail_after = match self.fail_reads_after.load(Ordering::SeqCst) {
            NO_FAILURE => None,
            n => Some(n),
        };
        Ok(Box::new(MemoryCursor {
            rows: rows.into(),
            counters: Arc::clone(&self.counters),
            released: false,
            fail_after,
            delivered: 0,
        }))
    }

    async fn update_one(&self, collection: &str, id: &RecordId, patch: Document) -> StorageResult<()> {
        self.tick();
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(collection).ok_or_else(|| missing(collection))?;
        let idx = table
            .position(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        let mut merged = table.rows[idx].clone();
        for (key, value) in patch {
            if key != ID_FIELD {
                merged.insert(key, value);
            }
        }
        table.check(&merged, Some(idx))?;
        table.rows[idx] = merged;
        Ok(())
    }

    async fn delete_one(&self, collection: &str, id: &RecordId) -> StorageResult<u64> {
        self.tick();
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(collection).ok_or_else(|| missing(collection))?;
        match table.position(id) {
            Some(idx) => {
                table.rows.remove(idx);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn count(&self, collection: &str, filter: &Filter) -> StorageResult<u64> {
        self.tick();
        let tables = self.tables.read().await;
        let table = tables.get(collection).ok_or_else(|| missing(collection))?;
        Ok(table.rows.iter().filter(|row| filter.matches(row)).count() as u64)
    }
}

/// Cursor over a snapshot taken when the query was opened.
struct MemoryCursor {
    rows: VecDeque<Document>,
    counters: Arc<Counters>,
    released: bool,
    fail_after: Option<usize>,
    delivered: usize,
}

#[async_trait]
impl CursorHandle for MemoryCursor {
    async fn read(&mut self, n: usize) -> StorageResult<Vec<Document>> {
        if self.released {
            return Err(StorageError::CursorReleased);
        }
        let mut batch = Vec::with_capacity(n.min(self.rows.len()));
        while batch.len() < n {
            if self.fail_after.is_some_and(|limit| self.delivered >= limit) && !self.rows.is_empty() {
                if batch.is_empty() {
                    return Err(StorageError::Connection("connection reset by peer".into()));
                }
                break;
            }
            match self.rows.pop_front() {
                Some(row) => {
                    self.delivered += 1;
                    batch.push(row);
                }
                None => break,
            }
        }
        Ok(batch)
    }

    fn release(&mut self) -> StorageResult<()> {
        if self.released {
            return Err(StorageError::CursorReleased);
        }
        self.released = true;
        self.counters.cursors_released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
