//! Built-in field kinds.
//!
//! Every kind here is registered by [`FieldTypeRegistry::with_defaults`].
//! Adding a new kind means implementing [`FieldType`] and registering it;
//! neither `Schema` nor the record layer needs to change.
//!
//! [`FieldTypeRegistry::with_defaults`]: crate::FieldTypeRegistry::with_defaults
//! [`FieldType`]: crate::FieldType

mod boolean;
mod identifier;
mod json;
mod numeric;
mod string;
mod temporal;

pub use self::boolean::BooleanFieldType;
pub use self::identifier::{ReferenceFieldType, UuidFieldType};
pub use self::json::{JsonFieldType, ObjectFieldType};
pub use self::numeric::{IntegerFieldType, NumberFieldType};
pub use self::string::StringFieldType;
pub use self::temporal::{DateFieldType, DateTimeFieldType};

use crate::FieldType;
use std::sync::Arc;

/// All built-in kinds, in registration order.
pub fn defaults() -> Vec<Arc<dyn FieldType>> {
    vec![
        Arc::new(BooleanFieldType),
        Arc::new(StringFieldType),
        Arc::new(IntegerFieldType),
        Arc::new(NumberFieldType),
        Arc::new(DateFieldType),
        Arc::new(DateTimeFieldType),
        Arc::new(JsonFieldType),
        Arc::new(ObjectFieldType),
        Arc::new(UuidFieldType),
        Arc::new(ReferenceFieldType),
    ]
}
