//! Lazy, resource-scoped iteration over query results.

use crate::collection::Collection;
use crate::error::OdmResult;
use crate::record::Record;
use futures::Stream;
use std::collections::VecDeque;
use strata_storage::CursorHandle;
use strata_types::Document;
use tracing::{debug, warn};

/// Owns the reserved backend resource of a cursor and returns it exactly
/// once, on whichever exit path comes first.
struct Reservation {
    handle: Option<Box<dyn CursorHandle>>,
    collection: String,
}

impl Reservation {
    fn release(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        match handle.release() {
            Ok(()) => debug!(collection = %self.collection, "cursor released"),
            Err(err) => warn!(collection = %self.collection, error = %err, "failed to release cursor"),
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.release();
    }
}

/// A forward-only, non-restartable sequence of hydrated records.
///
/// Rows are pulled from the backend in batches of
/// [`OdmConfig::cursor_batch_size`](crate::OdmConfig::cursor_batch_size) and
/// each one runs through SELECT/AFTER on its own before it is yielded.
///
/// The backend resource is released when the rows run out, when a read
/// fails, on [`release`](RecordCursor::release), or when the cursor is
/// dropped; whichever happens first.
pub struct RecordCursor {
    collection: Collection,
    reservation: Reservation,
    rows: VecDeque<Document>,
    pending: VecDeque<Record>,
    batch_size: usize,
    exhausted: bool,
}

impl RecordCursor {
    pub(crate) fn open(collection: Collection, handle: Box<dyn CursorHandle>) -> Self {
        let batch_size = collection.config().batch_size();
        let reservation = Reservation {
            handle: Some(handle),
            collection: collection.name().to_string(),
        };
        Self {
            collection,
            reservation,
            rows: VecDeque::new(),
            pending: VecDeque::new(),
            batch_size,
            exhausted: false,
        }
    }

    /// A cursor that yields nothing and holds no resource.
    pub(crate) fn empty(collection: Collection) -> Self {
        let reservation = Reservation {
            handle: None,
            collection: collection.name().to_string(),
        };
        Self {
            collection,
            reservation,
            rows: VecDeque::new(),
            pending: VecDeque::new(),
            batch_size: 1,
            exhausted: true,
        }
    }

    /// Whether the backend resource has been returned.
    pub fn is_released(&self) -> bool {
        self.reservation.handle.is_none()
    }

    /// Stops iteration and returns the backend resource. Release failures are
    /// logged, never returned.
    pub fn release(&mut self) {
        self.exhausted = true;
        self.rows.clear();
        self.pending.clear();
        self.reservation.release();
    }

    /// The next record, or `None` once the results are exhausted.
    pub async fn next(&mut self) -> OdmResult<Option<Record>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Ok(Some(record));
            }
            let Some(raw) = self.next_row().await? else {
                return Ok(None);
            };
            let record = Record::loaded(&self.collection, raw);
            let surviving = self.collection.select_after(record).await?;
            self.pending.extend(surviving);
        }
    }

    async fn next_row(&mut self) -> OdmResult<Option<Document>> {
        if let Some(row) = self.rows.pop_front() {
            return Ok(Some(row));
        }
        if self.exhausted {
            return Ok(None);
        }
        let Some(handle) = self.reservation.handle.as_mut() else {
            self.exhausted = true;
            return Ok(None);
        };

        let read = handle.read(self.batch_size).await;
        match read {
            Ok(batch) if batch.is_empty() => {
                self.exhausted = true;
                self.reservation.release();
                Ok(None)
            }
            Ok(batch) => {
                self.rows.extend(batch);
                Ok(self.rows.pop_front())
            }
            Err(err) => {
                warn!(collection = self.collection.name(), error = %err, "cursor read failed");
                self.exhausted = true;
                self.reservation.release();
                Err(err.into())
            }
        }
    }

    /// Drains the cursor into a vector.
    pub async fn collect_all(mut self) -> OdmResult<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Adapts the cursor into a [`Stream`]. The stream ends after the first
    /// error.
    pub fn into_stream(self) -> impl Stream<Item = OdmResult<Record>> + Send {
        futures::stream::unfold(Some(self), |state| async move {
            let mut cursor = state?;
            match cursor.next().await {
                Ok(Some(record)) => Some((Ok(record), Some(cursor))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }
}

impl std::fmt::Debug for RecordCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCursor")
            .field("collection", &self.collection.name())
            .field("released", &self.is_released())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
