//! Error types for schema definition and record validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use strata_storage::StorageError;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// A malformed schema, raised when the schema is defined. Fatal to that
/// definition only; nothing is registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("schema name not provided")]
    MissingName,

    #[error("schema name should be alphanumeric - [name={0}]")]
    InvalidName(String),

    #[error("schema name already exists - [name={0}]")]
    DuplicateSchema(String),

    #[error("'{schema}' cannot extend '{parent}'. '{parent}' does not exist")]
    UnknownParent { schema: String, parent: String },

    #[error("'{schema}' cannot extend '{parent}'. '{parent}' is a final schema")]
    FinalParent { schema: String, parent: String },

    #[error("inheritance cycle detected - [schema={schema}, revisited={parent}]")]
    InheritanceCycle { schema: String, parent: String },

    #[error("field type not provided - [schema={schema}, field={field}]")]
    MissingFieldType { schema: String, field: String },

    #[error("no such field type - [schema={schema}, field={field}, type={field_type}]")]
    UnknownFieldType {
        schema: String,
        field: String,
        field_type: String,
    },

    #[error("invalid field definition - [schema={schema}, field={field}]")]
    InvalidField { schema: String, field: String },

    #[error("duplicate field name - [schema={schema}, field={field}]")]
    DuplicateField { schema: String, field: String },

    #[error("schema '{schema}' is extended by '{child}'")]
    HasSubtypes { schema: String, child: String },
}

impl DefinitionError {
    /// Name of the schema being defined, when known.
    pub fn schema(&self) -> Option<&str> {
        match self {
            Self::MissingName => None,
            Self::InvalidName(s) | Self::DuplicateSchema(s) => Some(s),
            Self::UnknownParent { schema, .. }
            | Self::FinalParent { schema, .. }
            | Self::InheritanceCycle { schema, .. }
            | Self::MissingFieldType { schema, .. }
            | Self::UnknownFieldType { schema, .. }
            | Self::InvalidField { schema, .. }
            | Self::DuplicateField { schema, .. }
            | Self::HasSubtypes { schema, .. } => Some(schema),
        }
    }

    /// Name of the offending field, when the error concerns one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingFieldType { field, .. }
            | Self::UnknownFieldType { field, .. }
            | Self::InvalidField { field, .. }
            | Self::DuplicateField { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// The three failure classes a field kind can report for a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    /// Value missing and the field has no default.
    Required,
    /// Value has the wrong primitive shape.
    NotValidType,
    /// Value has the right shape but is out of range / malformed.
    NotValidValue,
}

impl ViolationKind {
    /// Human-readable message for `field` of kind `type_name`.
    pub fn message(&self, field: &str, type_name: &str) -> String {
        match self {
            Self::Required => format!("{field} is a required field"),
            Self::NotValidType => format!("{field} should be a {type_name}"),
            Self::NotValidValue => format!("{field} should be a valid {type_name}"),
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Required => "REQUIRED",
            Self::NotValidType => "NOT_VALID_TYPE",
            Self::NotValidValue => "NOT_VALID_VALUE",
        })
    }
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

/// Aggregate of every field violation found in one record. Never partial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.message())]
pub struct ValidationError {
    pub schema: String,
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// All field messages joined the way they are reported to callers.
    pub fn message(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join(", \n")
    }

    pub fn violation(&self, field: &str) -> Option<&FieldViolation> {
        self.violations.iter().find(|v| v.field == field)
    }
}

/// Errors produced by the model layer.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
