use crate::collection::Collection;
use crate::cursor::RecordCursor;
use crate::error::OdmResult;
use crate::record::Record;
use strata_storage::{Filter, FindOptions, SortDirection};

/// A read over one collection, built with [`Collection::find`] and executed
/// by [`first`](Query::first), [`to_vec`](Query::to_vec),
/// [`cursor`](Query::cursor) or [`count`](Query::count).
///
/// The filter is normalized when the query is built, so what
/// [`filter`](Query::filter) returns is exactly what the backend receives.
#[derive(Debug, Clone)]
pub struct Query {
    collection: Collection,
    filter: Filter,
    options: FindOptions,
}

impl Query {
    pub(crate) fn new(collection: Collection, filter: Filter) -> Self {
        let filter = collection.format_filter(filter);
        Self {
            collection,
            filter,
            options: FindOptions::default(),
        }
    }

    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.options = self.options.sort(field, direction);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.options = self.options.limit(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.options = self.options.offset(offset);
        self
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    /// The first matching record that survives SELECT/AFTER.
    pub async fn first(&self) -> OdmResult<Option<Record>> {
        let collection = &self.collection;
        if !collection.select_before().await? {
            return Ok(None);
        }
        collection.log_query("find_one", || format!("{:?}", self.filter));
        let raw = collection
            .backend()
            .find_one(collection.host_name(), &self.filter, &self.options)
            .await?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let record = Record::loaded(collection, raw);
        Ok(collection.select_after(record).await?.into_iter().next())
    }

    /// Opens a lazy cursor. The backend resource is held until the cursor
    /// is exhausted, released or dropped.
    pub async fn cursor(&self) -> OdmResult<RecordCursor> {
        let collection = &self.collection;
        if !collection.select_before().await? {
            return Ok(RecordCursor::empty(collection.clone()));
        }
        collection.log_query("find", || format!("{:?}", self.filter));
        let handle = collection
            .backend()
            .find(collection.host_name(), &self.filter, &self.options)
            .await?;
        Ok(RecordCursor::open(collection.clone(), handle))
    }

    /// Every matching record, pulled through a cursor.
    pub async fn to_vec(&self) -> OdmResult<Vec<Record>> {
        self.cursor().await?.collect_all().await
    }

    /// Number of stored documents matching the filter. Sort, limit and
    /// offset do not apply, and interceptors are not run.
    pub async fn count(&self) -> OdmResult<u64> {
        let collection = &self.collection;
        collection.log_query("count", || format!("{:?}", self.filter));
        Ok(collection
            .backend()
            .count(collection.host_name(), &self.filter)
            .await?)
    }
}
