use crate::{FieldType, PrimitiveType};

/// Any JSON value.
pub struct JsonFieldType;

impl FieldType for JsonFieldType {
    fn name(&self) -> &str {
        "json"
    }

    fn data_type(&self) -> PrimitiveType {
        PrimitiveType::Json
    }
}

/// A JSON object (embedded document).
pub struct ObjectFieldType;

impl FieldType for ObjectFieldType {
    fn name(&self) -> &str {
        "object"
    }

    fn data_type(&self) -> PrimitiveType {
        PrimitiveType::Object
    }
}
