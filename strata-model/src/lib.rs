//! Schema model for strata.
//!
//! Defines everything needed to turn a declarative entity description into a
//! validated, inheritance-resolved [`Schema`]:
//! - [`SchemaDefinition`] / [`FieldDefinition`]: the serde-friendly input shape
//! - [`FieldType`]: the pluggable strategy governing validation and value
//!   transforms for one field kind, each owning one [`PrimitiveType`]
//! - [`FieldTypeRegistry`]: the single extension point mapping type tags to kinds
//! - [`Schema`]: the resolved entity: merged field list, host store,
//!   discriminator, defaults, aggregate validation
//!
//! Nothing here performs CRUD; `strata-odm` composes these types with a
//! storage backend and the interceptor pipeline.

mod data_type;
mod definition;
mod error;
mod field_type;
pub mod field_types;
mod registry;
mod schema;

pub use data_type::PrimitiveType;
pub use definition::{FieldDefinition, SchemaDefinition};
pub use error::{DefinitionError, FieldViolation, ModelError, ModelResult, ValidationError, ViolationKind};
pub use field_type::{
    FieldError, FieldType, ValidationContext, is_scalar, required_validation, unique_validation,
};
pub use registry::{FieldTypeRegistry, SchemaLookup};
pub use schema::{Field, Schema};
