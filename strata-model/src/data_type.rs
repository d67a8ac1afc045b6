//! Primitive data types underlying the field kinds.

use crate::error::ViolationKind;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// The storage-level shape a field kind owns. Each kind owns exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Boolean,
    String,
    Integer,
    Number,
    Date,
    DateTime,
    Json,
    Object,
    Uuid,
}

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

impl PrimitiveType {
    /// Checks the shape of a present, non-null value.
    pub fn check(&self, value: &Value) -> Result<(), ViolationKind> {
        match self {
            Self::Boolean => expect(value.is_boolean()),
            Self::String => expect(value.is_string()),
            Self::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(()),
                Value::Number(n) => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => Ok(()),
                    _ => Err(ViolationKind::NotValidValue),
                },
                _ => Err(ViolationKind::NotValidType),
            },
            Self::Number => expect(value.is_number()),
            Self::Date => {
                let s = value.as_str().ok_or(ViolationKind::NotValidType)?;
                parse_date(s).map(|_| ()).ok_or(ViolationKind::NotValidValue)
            }
            Self::DateTime => {
                let s = value.as_str().ok_or(ViolationKind::NotValidType)?;
                parse_datetime(s).map(|_| ()).ok_or(ViolationKind::NotValidValue)
            }
            Self::Json => Ok(()),
            Self::Object => expect(value.is_object()),
            Self::Uuid => {
                let s = value.as_str().ok_or(ViolationKind::NotValidType)?;
                Uuid::parse_str(s.trim())
                    .map(|_| ())
                    .map_err(|_| ViolationKind::NotValidValue)
            }
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Json => "json",
            Self::Object => "object",
            Self::Uuid => "uuid",
        })
    }
}

fn expect(ok: bool) -> Result<(), ViolationKind> {
    if ok { Ok(()) } else { Err(ViolationKind::NotValidType) }
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Accepts RFC 3339 (converted to UTC) or a naive ISO timestamp (taken as UTC).
pub(crate) fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
