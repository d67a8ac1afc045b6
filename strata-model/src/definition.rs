use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_types::Document;

/// Declarative description of one entity, as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,
    /// Name of the parent schema whose fields (and host store) are inherited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// A final schema cannot be extended.
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default, alias = "columns")]
    pub fields: Vec<FieldDefinition>,
}

impl SchemaDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    #[must_use]
    pub fn final_schema(mut self) -> Self {
        self.is_final = true;
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Parses a definition from its JSON form
    /// (`{"name": ..., "extends": ..., "final": ..., "fields": [...]}`).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One field of a schema definition.
///
/// Kind-specific settings (`max_length`, `minimum`, `references`, ...) are
/// kept in `options` and interpreted by the field kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    #[serde(default, alias = "required", skip_serializing_if = "std::ops::Not::not")]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(flatten)]
    pub options: Document,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            ..Default::default()
        }
    }

    /// Shorthand for a string field.
    pub fn string(name: &str) -> Self {
        Self::new(name, "string")
    }

    /// Shorthand for an integer field.
    pub fn integer(name: &str) -> Self {
        Self::new(name, "integer")
    }

    /// Shorthand for a floating-point number field.
    pub fn number(name: &str) -> Self {
        Self::new(name, "number")
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, "boolean")
    }

    /// Shorthand for a calendar date field (`YYYY-MM-DD`).
    pub fn date(name: &str) -> Self {
        Self::new(name, "date")
    }

    pub fn datetime(name: &str) -> Self {
        Self::new(name, "datetime")
    }

    /// Shorthand for an arbitrary JSON field.
    pub fn json(name: &str) -> Self {
        Self::new(name, "json")
    }

    pub fn object(name: &str) -> Self {
        Self::new(name, "object")
    }

    pub fn uuid(name: &str) -> Self {
        Self::new(name, "uuid")
    }

    /// Shorthand for a reference to a record of another entity.
    pub fn reference(name: &str, target: &str) -> Self {
        Self::new(name, "reference").option("references", target)
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets a kind-specific option.
    #[must_use]
    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn get_option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }
}
