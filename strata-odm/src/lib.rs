//! Schema-driven data mapping for strata.
//!
//! Define a collection once from a [`SchemaDefinition`] and get validated
//! CRUD, polymorphic field typing and an ordered before/after interceptor
//! pipeline over any [`Backend`].
//!
//! # Architecture
//!
//! - [`Odm`] owns the registries (field kinds, interceptors, collections)
//!   and the backend; it is injected into every [`Collection`] it creates
//! - [`Collection`] is the per-schema façade; suppression and context live
//!   on the handle, so derived handles never affect each other
//! - [`Record`] holds values for one entity instance and refers back to its
//!   collection without keeping it alive
//! - [`Interceptor`]s wrap every CREATE/UPDATE/DELETE/SELECT in a BEFORE and
//!   an AFTER phase; a BEFORE halt means storage is never called
//! - [`RecordCursor`] streams query results, running SELECT/AFTER per
//!   record, and always returns its backend resource
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use strata_odm::{FieldDefinition, MemoryBackend, Odm, SchemaDefinition};
//!
//! # async fn run() -> strata_odm::OdmResult<()> {
//! let odm = Odm::new(Arc::new(MemoryBackend::new()));
//! let employees = odm
//!     .define_collection(
//!         SchemaDefinition::new("employee")
//!             .field(FieldDefinition::string("name").unique())
//!             .field(FieldDefinition::integer("salary").not_null()),
//!     )
//!     .await?;
//!
//! let mut record = employees.create_new_record();
//! record.set("name", "John").set("salary", 5000);
//! let stored = employees.insert(&record).await?;
//! assert_eq!(stored.get("salary"), Some(&5000.into()));
//! # Ok(())
//! # }
//! ```

mod collection;
mod config;
mod cursor;
mod error;
mod intercept;
mod odm;
mod query;
mod record;

pub use collection::{Collection, RecordLookup};
pub use config::{DEFAULT_CURSOR_BATCH_SIZE, OdmConfig};
pub use cursor::RecordCursor;
pub use error::{OdmError, OdmResult};
pub use intercept::{Interception, Interceptor, InterceptorRegistry, Suppression};
pub use odm::Odm;
pub use query::Query;
pub use record::{Record, RecordState};

pub use strata_model::{
    DefinitionError, FieldDefinition, FieldType, FieldViolation, PrimitiveType, Schema,
    SchemaDefinition, ValidationError, ViolationKind,
};
pub use strata_storage::{
    Backend, Filter, FindOptions, MemoryBackend, SortDirection, StorageError,
};
pub use strata_types::{
    DISCRIMINATOR_FIELD, Document, ID_FIELD, OperationContext, OperationType, OperationWhen,
    RecordId,
};
