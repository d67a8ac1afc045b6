//! Resolved schemas.
//!
//! A [`Schema`] is built once from a [`SchemaDefinition`] and never changes.
//! Resolution walks the `extends` chain through a [`SchemaLookup`], so the
//! effective field list is fixed at definition time: own fields first, then
//! each ancestor's own fields nearest-first, then the implicit identity field
//! contributed by the root.

use crate::definition::{FieldDefinition, SchemaDefinition};
use crate::error::{DefinitionError, FieldViolation, ModelResult, ValidationError, ViolationKind};
use crate::field_type::{FieldError, FieldType, ValidationContext, is_scalar};
use crate::registry::{FieldTypeRegistry, SchemaLookup};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use strata_storage::CollectionSpec;
use strata_types::{Document, ID_FIELD, OperationContext};
use tracing::debug;

/// One field of a resolved schema, bound to its field kind.
#[derive(Clone)]
pub struct Field {
    definition: FieldDefinition,
    kind: Arc<dyn FieldType>,
    owner: String,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &FieldDefinition {
        &self.definition
    }

    pub fn field_type(&self) -> &Arc<dyn FieldType> {
        &self.kind
    }

    /// Type tag as declared.
    pub fn type_name(&self) -> &str {
        &self.definition.field_type
    }

    /// Schema that declared this field.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Whether this is the implicit identity field.
    pub fn is_identity(&self) -> bool {
        self.definition.name == ID_FIELD
    }
}

impl Field {
    fn violation(&self, kind: ViolationKind) -> FieldViolation {
        FieldViolation {
            field: self.name().to_string(),
            kind,
            message: kind.message(self.name(), self.kind.name()),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.definition.name)
            .field("type", &self.definition.field_type)
            .field("owner", &self.owner)
            .finish()
    }
}

/// A validated, inheritance-resolved entity schema.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    extends: Option<String>,
    is_final: bool,
    own_fields: Vec<FieldDefinition>,
    fields: Vec<Field>,
    /// Ancestors, nearest first.
    lineage: Vec<String>,
}

fn valid_name(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Schema {
    /// Validates `definition` and resolves its inheritance chain.
    ///
    /// Checks, in order: name presence and format, name uniqueness, parent
    /// existence and non-finality, field type presence and existence, per-kind
    /// definition validity, and duplicate names across the merged field set.
    pub fn resolve(
        definition: SchemaDefinition,
        field_types: &FieldTypeRegistry,
        lookup: &dyn SchemaLookup,
    ) -> Result<Self, DefinitionError> {
        let SchemaDefinition {
            name,
            extends,
            is_final,
            fields: own_fields,
        } = definition;

        if name.is_empty() {
            return Err(DefinitionError::MissingName);
        }
        if !valid_name(&name) {
            return Err(DefinitionError::InvalidName(name));
        }
        if lookup.contains(&name) {
            return Err(DefinitionError::DuplicateSchema(name));
        }
        if let Some(parent_name) = &extends {
            let parent = lookup.schema(parent_name).ok_or_else(|| DefinitionError::UnknownParent {
                schema: name.clone(),
                parent: parent_name.clone(),
            })?;
            if parent.is_final() {
                return Err(DefinitionError::FinalParent {
                    schema: name.clone(),
                    parent: parent_name.clone(),
                });
            }
        }

        let mut merged: Vec<(FieldDefinition, String)> = own_fields
            .iter()
            .cloned()
            .map(|f| (f, name.clone()))
            .collect();
        let mut lineage = Vec::new();
        let mut visited = HashSet::from([name.clone()]);
        let mut next = extends.clone();
        while let Some(parent_name) = next {
            if !visited.insert(parent_name.clone()) {
                return Err(DefinitionError::InheritanceCycle {
                    schema: name.clone(),
                    parent: parent_name,
                });
            }
            let parent = lookup.schema(&parent_name).ok_or_else(|| DefinitionError::UnknownParent {
                schema: name.clone(),
                parent: parent_name.clone(),
            })?;
            merged.extend(parent.own_fields().iter().cloned().map(|f| (f, parent_name.clone())));
            next = parent.extends().map(str::to_string);
            lineage.push(parent_name);
        }
        let root = lineage.last().unwrap_or(&name).clone();
        merged.push((FieldDefinition::uuid(ID_FIELD), root));

        let mut fields = Vec::with_capacity(merged.len());
        let mut seen = HashSet::new();
        for (field, owner) in merged {
            if field.field_type.is_empty() {
                return Err(DefinitionError::MissingFieldType {
                    schema: name.clone(),
                    field: field.name,
                });
            }
            let kind = field_types.get(&field.field_type).ok_or_else(|| {
                DefinitionError::UnknownFieldType {
                    schema: name.clone(),
                    field: field.name.clone(),
                    field_type: field.field_type.clone(),
                }
            })?;
            if !kind.validate_definition(&field) {
                return Err(DefinitionError::InvalidField {
                    schema: name.clone(),
                    field: field.name,
                });
            }
            if !seen.insert(field.name.clone()) {
                return Err(DefinitionError::DuplicateField {
                    schema: name.clone(),
                    field: field.name,
                });
            }
            fields.push(Field {
                definition: field,
                kind,
                owner,
            });
        }

        Ok(Self {
            name,
            extends,
            is_final,
            own_fields,
            fields,
            lineage,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extends(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn is_root(&self) -> bool {
        self.extends.is_none()
    }

    /// Ancestor names, nearest first.
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Name of the root ancestor, i.e. the physical store shared by every
    /// schema in this inheritance tree.
    pub fn host_name(&self) -> &str {
        self.lineage.last().unwrap_or(&self.name)
    }

    /// Discriminator value written into and filtered on for subtypes.
    pub fn discriminator(&self) -> Option<&str> {
        self.extends.as_ref().map(|_| self.name.as_str())
    }

    /// Fields declared by this schema itself.
    pub fn own_fields(&self) -> &[FieldDefinition] {
        &self.own_fields
    }

    /// The effective, merged field list.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(Field::name).collect()
    }

    /// Constraints the host store must enforce for this schema. Only fields
    /// of the host itself are pushed down, since sibling subtypes share the
    /// store and may declare the same field name without the constraint.
    pub fn collection_spec(&self) -> CollectionSpec {
        let host = self.host_name();
        let mut spec = CollectionSpec::new(host);
        for field in self
            .fields
            .iter()
            .filter(|f| !f.is_identity() && f.owner() == host)
        {
            let def = field.definition();
            if def.unique {
                spec.unique_fields.push(def.name.clone());
            }
            if def.not_null {
                spec.not_null_fields.push(def.name.clone());
            }
        }
        spec
    }

    /// Discriminator a uniqueness lookup on `field` is restricted to. Host
    /// fields are unique across the whole store; subtype fields only among
    /// records of this schema.
    fn uniqueness_scope(&self, field: &Field) -> Option<&str> {
        if field.owner() == self.host_name() {
            None
        } else {
            self.discriminator()
        }
    }

    /// Fills absent or null fields that declare a default.
    pub fn apply_defaults(&self, doc: &mut Document) {
        for field in &self.fields {
            let Some(default) = &field.definition.default else {
                continue;
            };
            if doc.get(field.name()).is_none_or(Value::is_null) {
                doc.insert(field.name().to_string(), default.clone());
            }
        }
    }

    /// Validates every field of `doc`, collecting all violations before
    /// failing.
    ///
    /// Storage-backed checks (uniqueness) only run once every field passes
    /// its local checks, so a malformed record never reaches the backend.
    /// Storage failures during a check abort immediately.
    pub async fn validate(&self, doc: &Document, ctx: &ValidationContext<'_>) -> ModelResult<()> {
        let local: Vec<FieldViolation> = self
            .fields
            .iter()
            .filter(|f| !f.is_identity())
            .filter_map(|field| {
                field
                    .kind
                    .validate_local(&field.definition, doc.get(field.name()))
                    .err()
                    .map(|kind| field.violation(kind))
            })
            .collect();
        if !local.is_empty() {
            return Err(self.rejected(local).into());
        }

        let mut violations = Vec::new();
        for field in self.fields.iter().filter(|f| !f.is_identity()) {
            let field_ctx = ctx.scoped(self.uniqueness_scope(field));
            match field
                .kind
                .validate_value(&field_ctx, &field.definition, doc.get(field.name()))
                .await
            {
                Ok(()) => {}
                Err(FieldError::Violation(kind)) => violations.push(field.violation(kind)),
                Err(FieldError::Storage(err)) => return Err(err.into()),
            }
        }

        if violations.is_empty() {
            return Ok(());
        }
        Err(self.rejected(violations).into())
    }

    fn rejected(&self, violations: Vec<FieldViolation>) -> ValidationError {
        debug!(schema = %self.name, violations = violations.len(), "record failed validation");
        ValidationError {
            schema: self.name.clone(),
            violations,
        }
    }

    /// Write-side transform of one value. Structured values, nulls and
    /// unknown fields pass through untouched.
    pub fn intercept_value(&self, field_name: &str, value: Value, context: &OperationContext) -> Value {
        match self.field(field_name) {
            Some(field) if is_scalar(&value) => {
                field.kind.set_value_intercept(&field.definition, value, context)
            }
            _ => value,
        }
    }

    /// Applies [`Schema::intercept_value`] to every entry of a payload.
    pub fn intercept_document(&self, doc: &mut Document, context: &OperationContext) {
        for (key, value) in doc.iter_mut() {
            let taken = std::mem::take(value);
            *value = self.intercept_value(key, taken, context);
        }
    }

    /// Read-side transform of a raw stored document.
    pub fn hydrate(&self, mut doc: Document, context: &OperationContext) -> Document {
        for field in &self.fields {
            if let Some(value) = doc.get_mut(field.name()).filter(|v| !v.is_null()) {
                let taken = std::mem::take(value);
                *value = field.kind.get_value_intercept(&field.definition, taken, context);
            }
        }
        doc
    }

    /// Presentation form of a document.
    pub fn display(&self, doc: &Document) -> Document {
        doc.iter()
            .map(|(key, value)| {
                let shown = match self.field(key) {
                    Some(field) if !value.is_null() => field.kind.display_value(&field.definition, value),
                    _ => value.clone(),
                };
                (key.clone(), shown)
            })
            .collect()
    }
}
