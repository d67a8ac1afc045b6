//! The field kind strategy trait and the checks shared by every kind.

use crate::data_type::PrimitiveType;
use crate::definition::FieldDefinition;
use crate::error::ViolationKind;
use async_trait::async_trait;
use serde_json::Value;
use strata_storage::{Backend, Filter, FindOptions, StorageError};
use strata_types::{DISCRIMINATOR_FIELD, ID_FIELD, OperationContext, RecordId};

/// Everything a field kind may consult while validating a value.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Backend used for storage-backed checks such as uniqueness.
    pub backend: &'a dyn Backend,
    /// Physical (host) collection the record is stored in.
    pub collection: &'a str,
    /// Identity of the record under validation, excluded from uniqueness hits.
    pub record_id: Option<RecordId>,
    /// Caller context of the handle performing the operation.
    pub context: &'a OperationContext,
    /// Discriminator value uniqueness lookups are restricted to. `None`
    /// searches the whole host store.
    pub scope: Option<&'a str>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        collection: &'a str,
        record_id: Option<RecordId>,
        context: &'a OperationContext,
    ) -> Self {
        Self {
            backend,
            collection,
            record_id,
            context,
            scope: None,
        }
    }

    /// The same context with uniqueness lookups restricted to `scope`.
    #[must_use]
    pub fn scoped(self, scope: Option<&'a str>) -> Self {
        Self { scope, ..self }
    }
}

/// Why a single value failed validation.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("{0}")]
    Violation(ViolationKind),

    /// A storage-backed check failed or found a conflict. Not aggregated.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ViolationKind> for FieldError {
    fn from(kind: ViolationKind) -> Self {
        Self::Violation(kind)
    }
}

/// A pluggable strategy governing validation and value transforms for one
/// field kind. Implementations are stateless and shared across schemas.
///
/// Only [`name`](FieldType::name) and [`data_type`](FieldType::data_type) are
/// required; the defaults compose the required check, the primitive shape
/// check, [`check_value`](FieldType::check_value) and the uniqueness check.
#[async_trait]
pub trait FieldType: Send + Sync {
    /// Type tag used in field definitions (e.g. `"string"`).
    fn name(&self) -> &str;

    /// The primitive data type this kind owns.
    fn data_type(&self) -> PrimitiveType;

    /// Validates a field definition using this kind.
    fn validate_definition(&self, definition: &FieldDefinition) -> bool {
        !definition.name.is_empty()
    }

    /// Kind-specific checks on a present, well-shaped value
    /// (ranges, lengths, formats).
    fn check_value(&self, definition: &FieldDefinition, value: &Value) -> Result<(), ViolationKind> {
        let _ = (definition, value);
        Ok(())
    }

    /// The checks that need no storage: required, primitive shape and
    /// [`check_value`](FieldType::check_value).
    fn validate_local(&self, definition: &FieldDefinition, value: Option<&Value>) -> Result<(), ViolationKind> {
        required_validation(definition, value)?;
        if let Some(value) = value.filter(|v| !v.is_null()) {
            self.data_type().check(value)?;
            self.check_value(definition, value)?;
        }
        Ok(())
    }

    /// Validates the value of `definition` in a record about to be written.
    async fn validate_value(
        &self,
        ctx: &ValidationContext<'_>,
        definition: &FieldDefinition,
        value: Option<&Value>,
    ) -> Result<(), FieldError> {
        self.validate_local(definition, value)?;
        unique_validation(ctx, definition, value).await
    }

    /// Write-time transform, applied to scalar values in payloads and
    /// filters before they reach storage.
    fn set_value_intercept(
        &self,
        definition: &FieldDefinition,
        value: Value,
        context: &OperationContext,
    ) -> Value {
        let _ = (definition, context);
        value
    }

    /// Read-time transform, applied when a raw row is hydrated into a record.
    fn get_value_intercept(
        &self,
        definition: &FieldDefinition,
        value: Value,
        context: &OperationContext,
    ) -> Value {
        let _ = (definition, context);
        value
    }

    /// Presentation form of a value, used when serializing a record for display.
    fn display_value(&self, definition: &FieldDefinition, value: &Value) -> Value {
        let _ = definition;
        value.clone()
    }
}

/// A value is scalar when it is neither structured nor null.
pub fn is_scalar(value: &Value) -> bool {
    !(value.is_object() || value.is_array() || value.is_null())
}

/// Fails with [`ViolationKind::Required`] when a not-null field has no value
/// and no default.
pub fn required_validation(definition: &FieldDefinition, value: Option<&Value>) -> Result<(), ViolationKind> {
    let missing = value.is_none_or(Value::is_null);
    if missing && definition.not_null && definition.default.is_none() {
        return Err(ViolationKind::Required);
    }
    Ok(())
}

/// Best-effort uniqueness lookup against the host collection.
///
/// A hit is reported as [`StorageError::UniqueViolation`], the same error the
/// backend raises for a racing duplicate write.
pub async fn unique_validation(
    ctx: &ValidationContext<'_>,
    definition: &FieldDefinition,
    value: Option<&Value>,
) -> Result<(), FieldError> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(());
    };
    if !definition.unique {
        return Ok(());
    }

    let mut filter = Filter::new().with(definition.name.clone(), value.clone());
    if let Some(scope) = ctx.scope {
        filter.insert(DISCRIMINATOR_FIELD, scope);
    }
    let existing = ctx
        .backend
        .find_one(ctx.collection, &filter, &FindOptions::default())
        .await?;
    let Some(existing) = existing else {
        return Ok(());
    };
    let existing_id = existing.get(ID_FIELD).and_then(RecordId::from_value);
    if existing_id.is_some() && existing_id == ctx.record_id {
        return Ok(());
    }
    Err(StorageError::UniqueViolation {
        collection: ctx.collection.to_string(),
        field: definition.name.clone(),
    }
    .into())
}
