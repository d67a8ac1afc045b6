use crate::{FieldDefinition, FieldType, PrimitiveType};
use serde_json::Value;
use strata_types::OperationContext;

pub struct BooleanFieldType;

impl FieldType for BooleanFieldType {
    fn name(&self) -> &str {
        "boolean"
    }

    fn data_type(&self) -> PrimitiveType {
        PrimitiveType::Boolean
    }

    fn set_value_intercept(&self, _: &FieldDefinition, value: Value, _: &OperationContext) -> Value {
        match value.as_str().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
            Some(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
            _ => value,
        }
    }
}
