//! Calendar date and timestamp kinds, stored as ISO-8601 text.

use crate::data_type::{DATE_FORMAT, parse_date, parse_datetime};
use crate::{FieldDefinition, FieldType, PrimitiveType};
use chrono::{SecondsFormat, TimeZone, Utc};
use serde_json::Value;
use strata_types::OperationContext;

/// `YYYY-MM-DD`.
pub struct DateFieldType;

impl FieldType for DateFieldType {
    fn name(&self) -> &str {
        "date"
    }

    fn data_type(&self) -> PrimitiveType {
        PrimitiveType::Date
    }

    fn set_value_intercept(&self, _: &FieldDefinition, value: Value, _: &OperationContext) -> Value {
        match value.as_str().and_then(parse_date) {
            Some(date) => Value::String(date.format(DATE_FORMAT).to_string()),
            None => value,
        }
    }
}

/// RFC 3339 or naive ISO timestamps; normalized to RFC 3339 UTC on write.
pub struct DateTimeFieldType;

impl FieldType for DateTimeFieldType {
    fn name(&self) -> &str {
        "datetime"
    }

    fn data_type(&self) -> PrimitiveType {
        PrimitiveType::DateTime
    }

    fn set_value_intercept(&self, _: &FieldDefinition, value: Value, _: &OperationContext) -> Value {
        match value.as_str().and_then(parse_datetime) {
            Some(naive) => Value::String(
                Utc.from_utc_datetime(&naive)
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
            None => value,
        }
    }
}
