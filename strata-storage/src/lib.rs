//! Storage boundary for strata.
//!
//! The data-mapping layer never talks to a database directly. Everything it
//! needs from a document store or a relational store goes through the narrow
//! [`Backend`] trait defined here, and large result sets are pulled through a
//! reserved [`CursorHandle`].
//!
//! # Architecture
//!
//! - Documents are untyped JSON maps ([`strata_types::Document`]); typing and
//!   validation happen above this layer
//! - Filters are plain equality constraints ([`Filter`]); translating them to
//!   SQL or a document-store query is the concrete driver's job
//! - Uniqueness and not-null constraints declared through
//!   [`CollectionSpec`] are enforced by the backend and reported as
//!   [`StorageError`]s, which callers must treat as authoritative
//! - [`MemoryBackend`] is a complete in-process implementation used by tests
//!   and as a reference for driver authors

mod backend;
mod error;
mod filter;
pub mod memory;

pub use backend::{Backend, CollectionSpec, CursorHandle};
pub use error::{StorageError, StorageResult};
pub use filter::{Filter, FindOptions, SortDirection, SortKey};
pub use memory::MemoryBackend;
