//! Identifier kinds. Loosely typed identifiers (braced, simple, upper-case,
//! padded) are converted to the canonical hyphenated form on write so filters
//! and payloads agree with what the backend stores.

use crate::{FieldDefinition, FieldType, PrimitiveType};
use serde_json::Value;
use strata_types::{OperationContext, RecordId};

fn canonical(value: Value) -> Value {
    match RecordId::from_value(&value) {
        Some(id) => id.to_value(),
        None => value,
    }
}

pub struct UuidFieldType;

impl FieldType for UuidFieldType {
    fn name(&self) -> &str {
        "uuid"
    }

    fn data_type(&self) -> PrimitiveType {
        PrimitiveType::Uuid
    }

    fn set_value_intercept(&self, _: &FieldDefinition, value: Value, _: &OperationContext) -> Value {
        canonical(value)
    }
}

/// Identity of a record in another entity, named by the `references` option.
pub struct ReferenceFieldType;

impl FieldType for ReferenceFieldType {
    fn name(&self) -> &str {
        "reference"
    }

    fn data_type(&self) -> PrimitiveType {
        PrimitiveType::Uuid
    }

    fn validate_definition(&self, definition: &FieldDefinition) -> bool {
        !definition.name.is_empty()
            && definition
                .get_option("references")
                .and_then(Value::as_str)
                .is_some_and(|target| !target.is_empty())
    }

    fn set_value_intercept(&self, _: &FieldDefinition, value: Value, _: &OperationContext) -> Value {
        canonical(value)
    }
}
