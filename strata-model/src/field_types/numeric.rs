//! Integer and floating-point kinds.
//!
//! Both honor optional `minimum` / `maximum` bounds, accept numeric strings
//! on the write side, and on the read side repair values that some drivers
//! return as strings (e.g. `numeric`/`bigint` columns).

use crate::{FieldDefinition, FieldType, PrimitiveType, ViolationKind};
use serde_json::{Number, Value};
use strata_types::OperationContext;

fn bound(definition: &FieldDefinition, key: &str) -> Option<f64> {
    definition.get_option(key).and_then(Value::as_f64)
}

fn bounds_are_valid(definition: &FieldDefinition) -> bool {
    for key in ["minimum", "maximum"] {
        if definition.get_option(key).is_some_and(|v| !v.is_number()) {
            return false;
        }
    }
    match (bound(definition, "minimum"), bound(definition, "maximum")) {
        (Some(min), Some(max)) => min <= max,
        _ => true,
    }
}

fn check_bounds(definition: &FieldDefinition, value: &Value) -> Result<(), ViolationKind> {
    let Some(n) = value.as_f64() else {
        return Ok(());
    };
    if bound(definition, "minimum").is_some_and(|min| n < min)
        || bound(definition, "maximum").is_some_and(|max| n > max)
    {
        return Err(ViolationKind::NotValidValue);
    }
    Ok(())
}

fn parse_integer(s: &str) -> Option<Value> {
    s.trim().parse::<i64>().ok().map(Value::from)
}

/// Canonical integer form: numeric strings are parsed and whole floats
/// (`7.0`) become `7`, so equality in storage and filters sees one value.
fn as_integer(value: Value) -> Value {
    match &value {
        Value::String(s) => parse_integer(s).unwrap_or(value),
        Value::Number(n) if !(n.is_i64() || n.is_u64()) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(f as i64),
            _ => value,
        },
        _ => value,
    }
}

fn parse_number(s: &str) -> Option<Value> {
    s.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

pub struct IntegerFieldType;

impl FieldType for IntegerFieldType {
    fn name(&self) -> &str {
        "integer"
    }

    fn data_type(&self) -> PrimitiveType {
        PrimitiveType::Integer
    }

    fn validate_definition(&self, definition: &FieldDefinition) -> bool {
        !definition.name.is_empty() && bounds_are_valid(definition)
    }

    fn check_value(&self, definition: &FieldDefinition, value: &Value) -> Result<(), ViolationKind> {
        check_bounds(definition, value)
    }

    fn set_value_intercept(&self, _: &FieldDefinition, value: Value, _: &OperationContext) -> Value {
        as_integer(value)
    }

    fn get_value_intercept(&self, _: &FieldDefinition, value: Value, _: &OperationContext) -> Value {
        as_integer(value)
    }
}

pub struct NumberFieldType;

impl FieldType for NumberFieldType {
    fn name(&self) -> &str {
        "number"
    }

    fn data_type(&self) -> PrimitiveType {
        PrimitiveType::Number
    }

    fn validate_definition(&self, definition: &FieldDefinition) -> bool {
        !definition.name.is_empty() && bounds_are_valid(definition)
    }

    fn check_value(&self, definition: &FieldDefinition, value: &Value) -> Result<(), ViolationKind> {
        check_bounds(definition, value)
    }

    fn set_value_intercept(&self, _: &FieldDefinition, value: Value, _: &OperationContext) -> Value {
        match value.as_str().and_then(parse_number) {
            Some(parsed) => parsed,
            None => value,
        }
    }

    fn get_value_intercept(&self, _: &FieldDefinition, value: Value, _: &OperationContext) -> Value {
        match value.as_str().and_then(parse_number) {
            Some(parsed) => parsed,
            None => value,
        }
    }
}
