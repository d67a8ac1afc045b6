use crate::{FieldDefinition, FieldType, PrimitiveType, ViolationKind};
use serde_json::Value;

/// Text field. Honors an optional positive `max_length` (in characters).
pub struct StringFieldType;

impl StringFieldType {
    fn max_length(definition: &FieldDefinition) -> Option<&Value> {
        definition.get_option("max_length")
    }
}

impl FieldType for StringFieldType {
    fn name(&self) -> &str {
        "string"
    }

    fn data_type(&self) -> PrimitiveType {
        PrimitiveType::String
    }

    fn validate_definition(&self, definition: &FieldDefinition) -> bool {
        if definition.name.is_empty() {
            return false;
        }
        match Self::max_length(definition) {
            None => true,
            Some(v) => v.as_u64().is_some_and(|n| n > 0),
        }
    }

    fn check_value(&self, definition: &FieldDefinition, value: &Value) -> Result<(), ViolationKind> {
        let (Some(max), Some(s)) = (Self::max_length(definition).and_then(Value::as_u64), value.as_str())
        else {
            return Ok(());
        };
        if s.chars().count() as u64 > max {
            return Err(ViolationKind::NotValidValue);
        }
        Ok(())
    }
}
