use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use strata_model::{
    DefinitionError, FieldDefinition, FieldTypeRegistry, Schema, SchemaDefinition,
};
use strata_types::{ID_FIELD, OperationContext};
use serde_json::json;

type Registry = HashMap<String, Arc<Schema>>;

fn define(registry: &mut Registry, definition: SchemaDefinition) -> Result<Arc<Schema>, DefinitionError> {
    let schema = Arc::new(Schema::resolve(
        definition,
        &FieldTypeRegistry::with_defaults(),
        registry,
    )?);
    registry.insert(schema.name().to_string(), Arc::clone(&schema));
    Ok(schema)
}

fn animal_tree() -> Registry {
    let mut registry = Registry::new();
    define(
        &mut registry,
        SchemaDefinition::new("animal")
            .field(FieldDefinition::string("name").not_null())
            .field(FieldDefinition::integer("legs")),
    )
    .unwrap();
    define(
        &mut registry,
        SchemaDefinition::new("dog")
            .extends("animal")
            .field(FieldDefinition::string("breed").unique()),
    )
    .unwrap();
    define(
        &mut registry,
        SchemaDefinition::new("puppy")
            .extends("dog")
            .final_schema()
            .field(FieldDefinition::date("born")),
    )
    .unwrap();
    registry
}

// ── Field merging ────────────────────────────────────────────────

#[test]
fn root_schema_gets_identity_field_last() {
    let registry = animal_tree();
    let animal = &registry["animal"];
    assert_eq!(animal.field_names(), vec!["name", "legs", ID_FIELD]);
    assert!(animal.fields().last().unwrap().is_identity());
    assert_eq!(animal.field(ID_FIELD).unwrap().type_name(), "uuid");
}

#[test]
fn grandchild_fields_are_own_then_ancestors_then_identity() {
    let registry = animal_tree();
    let puppy = &registry["puppy"];
    assert_eq!(
        puppy.field_names(),
        vec!["born", "breed", "name", "legs", ID_FIELD]
    );
    let identity_count = puppy.fields().iter().filter(|f| f.is_identity()).count();
    assert_eq!(identity_count, 1);
}

#[test]
fn fields_remember_their_declaring_schema() {
    let registry = animal_tree();
    let puppy = &registry["puppy"];
    assert_eq!(puppy.field("born").unwrap().owner(), "puppy");
    assert_eq!(puppy.field("breed").unwrap().owner(), "dog");
    assert_eq!(puppy.field("name").unwrap().owner(), "animal");
    assert_eq!(puppy.field(ID_FIELD).unwrap().owner(), "animal");
}

#[test]
fn host_lineage_and_discriminator() {
    let registry = animal_tree();
    let animal = &registry["animal"];
    let puppy = &registry["puppy"];

    assert_eq!(animal.host_name(), "animal");
    assert!(animal.is_root());
    assert_eq!(animal.discriminator(), None);

    assert_eq!(puppy.host_name(), "animal");
    assert_eq!(puppy.lineage(), &["dog".to_string(), "animal".to_string()]);
    assert_eq!(puppy.discriminator(), Some("puppy"));
    assert_eq!(puppy.own_fields().len(), 1);
}

proptest! {
    /// For any chain of schemas, the effective list is the concatenation of
    /// own fields from the leaf up to the root, plus one identity field.
    #[test]
    fn chain_fields_concatenate(field_counts in prop::collection::vec(0usize..4, 1..6)) {
        let mut registry = Registry::new();
        let mut expected: Vec<String> = Vec::new();
        let depth = field_counts.len();

        for (level, count) in field_counts.iter().enumerate() {
            let mut def = SchemaDefinition::new(format!("level{level}"));
            if level > 0 {
                def = def.extends(format!("level{}", level - 1));
            }
            for i in 0..*count {
                def = def.field(FieldDefinition::string(&format!("l{level}_f{i}")));
            }
            define(&mut registry, def).unwrap();
        }

        for level in (0..depth).rev() {
            for i in 0..field_counts[level] {
                expected.push(format!("l{level}_f{i}"));
            }
        }
        expected.push(ID_FIELD.to_string());

        let leaf = &registry[&format!("level{}", depth - 1)];
        let names: Vec<String> = leaf.field_names().into_iter().map(String::from).collect();
        prop_assert_eq!(names, expected);
        prop_assert_eq!(leaf.host_name(), "level0");
    }

    /// Extending a final schema fails whatever the child's fields are.
    #[test]
    fn final_schema_never_extendable(count in 0usize..5) {
        let mut registry = Registry::new();
        define(&mut registry, SchemaDefinition::new("base").final_schema()).unwrap();
        let mut child = SchemaDefinition::new("child").extends("base");
        for i in 0..count {
            child = child.field(FieldDefinition::integer(&format!("f{i}")));
        }
        let err = define(&mut registry, child).unwrap_err();
        let is_final_parent = matches!(err, DefinitionError::FinalParent { .. });
        prop_assert!(is_final_parent);
        prop_assert!(!registry.contains_key("child"));
    }
}

// ── Definition errors ────────────────────────────────────────────

#[test]
fn missing_and_malformed_names_are_rejected() {
    let mut registry = Registry::new();
    assert_eq!(
        define(&mut registry, SchemaDefinition::new("")).unwrap_err(),
        DefinitionError::MissingName
    );
    assert_eq!(
        define(&mut registry, SchemaDefinition::new("bad-name")).unwrap_err(),
        DefinitionError::InvalidName("bad-name".into())
    );
    assert!(define(&mut registry, SchemaDefinition::new("Good_Name_2")).is_ok());
}

#[test]
fn second_schema_with_same_name_fails() {
    let mut registry = Registry::new();
    define(&mut registry, SchemaDefinition::new("employee")).unwrap();
    let err = define(
        &mut registry,
        SchemaDefinition::new("employee").field(FieldDefinition::string("other")),
    )
    .unwrap_err();
    assert_eq!(err, DefinitionError::DuplicateSchema("employee".into()));
    assert_eq!(registry["employee"].field_names(), vec![ID_FIELD]);
}

#[test]
fn extending_unknown_schema_fails() {
    let mut registry = Registry::new();
    let err = define(&mut registry, SchemaDefinition::new("cat").extends("ghost")).unwrap_err();
    assert_eq!(
        err,
        DefinitionError::UnknownParent {
            schema: "cat".into(),
            parent: "ghost".into()
        }
    );
    assert_eq!(
        err.to_string(),
        "'cat' cannot extend 'ghost'. 'ghost' does not exist"
    );
}

#[test]
fn extending_final_schema_fails() {
    let mut registry = animal_tree();
    let err = define(&mut registry, SchemaDefinition::new("teacup").extends("puppy")).unwrap_err();
    assert_eq!(err.schema(), Some("teacup"));
    assert!(matches!(err, DefinitionError::FinalParent { parent, .. } if parent == "puppy"));
}

#[test]
fn unknown_field_type_names_schema_and_field() {
    let mut registry = Registry::new();
    let err = define(
        &mut registry,
        SchemaDefinition::new("t").field(FieldDefinition::new("blob", "binary")),
    )
    .unwrap_err();
    assert_eq!(err.schema(), Some("t"));
    assert_eq!(err.field(), Some("blob"));
    assert!(matches!(err, DefinitionError::UnknownFieldType { field_type, .. } if field_type == "binary"));
}

#[test]
fn missing_field_type_is_rejected() {
    let mut registry = Registry::new();
    let def = SchemaDefinition::from_json(r#"{"name": "t", "fields": [{"name": "x"}]}"#).unwrap();
    let err = define(&mut registry, def).unwrap_err();
    assert!(matches!(err, DefinitionError::MissingFieldType { field, .. } if field == "x"));
}

#[test]
fn kind_specific_definition_checks_apply() {
    let mut registry = Registry::new();
    let dangling = SchemaDefinition::new("a").field(FieldDefinition::new("owner", "reference"));
    assert!(matches!(
        define(&mut registry, dangling).unwrap_err(),
        DefinitionError::InvalidField { .. }
    ));

    let zero_length = SchemaDefinition::new("b")
        .field(FieldDefinition::string("code").option("max_length", 0));
    assert!(matches!(
        define(&mut registry, zero_length).unwrap_err(),
        DefinitionError::InvalidField { .. }
    ));

    let inverted = SchemaDefinition::new("c").field(
        FieldDefinition::integer("n")
            .option("minimum", 10)
            .option("maximum", 1),
    );
    assert!(matches!(
        define(&mut registry, inverted).unwrap_err(),
        DefinitionError::InvalidField { .. }
    ));

    let unnamed = SchemaDefinition::new("d").field(FieldDefinition::boolean(""));
    assert!(matches!(
        define(&mut registry, unnamed).unwrap_err(),
        DefinitionError::InvalidField { .. }
    ));
    assert!(registry.is_empty());
}

#[test]
fn duplicate_names_across_inheritance_are_rejected() {
    let mut registry = animal_tree();
    let err = define(
        &mut registry,
        SchemaDefinition::new("cat")
            .extends("animal")
            .field(FieldDefinition::string("name")),
    )
    .unwrap_err();
    assert_eq!(
        err,
        DefinitionError::DuplicateField {
            schema: "cat".into(),
            field: "name".into()
        }
    );
}

#[test]
fn declaring_the_identity_field_is_a_duplicate() {
    let mut registry = Registry::new();
    let err = define(
        &mut registry,
        SchemaDefinition::new("t").field(FieldDefinition::uuid(ID_FIELD)),
    )
    .unwrap_err();
    assert!(matches!(err, DefinitionError::DuplicateField { field, .. } if field == ID_FIELD));
}

#[test]
fn inheritance_cycle_is_detected() {
    // Two lookups that disagree about "b" produce a chain that loops back.
    let mut first = Registry::new();
    define(&mut first, SchemaDefinition::new("b")).unwrap();
    let c = Arc::new(
        Schema::resolve(
            SchemaDefinition::new("c").extends("b"),
            &FieldTypeRegistry::with_defaults(),
            &first,
        )
        .unwrap(),
    );

    let mut second = Registry::new();
    second.insert("c".into(), c);
    let err = Schema::resolve(
        SchemaDefinition::new("b").extends("c"),
        &FieldTypeRegistry::with_defaults(),
        &second,
    )
    .unwrap_err();
    assert_eq!(
        err,
        DefinitionError::InheritanceCycle {
            schema: "b".into(),
            parent: "b".into()
        }
    );
}

#[test]
fn definition_parses_from_json_with_columns_alias() {
    let def = SchemaDefinition::from_json(
        r#"{
            "name": "employee",
            "final": true,
            "columns": [
                {"name": "name", "type": "string", "unique": true},
                {"name": "salary", "type": "integer", "not_null": true},
                {"name": "rating", "type": "number", "default": 4.5},
                {"name": "dept", "type": "reference", "references": "department", "required": true}
            ]
        }"#,
    )
    .unwrap();

    assert!(def.is_final);
    assert_eq!(def.fields.len(), 4);
    assert!(def.fields[0].unique);
    assert!(def.fields[1].not_null);
    assert_eq!(def.fields[2].default, Some(json!(4.5)));
    assert!(def.fields[3].not_null);
    assert_eq!(def.fields[3].get_option("references"), Some(&json!("department")));

    let mut registry = Registry::new();
    assert!(define(&mut registry, def).is_ok());
}

// ── Derived data ─────────────────────────────────────────────────

#[test]
fn collection_spec_pushes_down_host_constraints_only() {
    let mut registry = animal_tree();
    let cat = define(
        &mut registry,
        SchemaDefinition::new("cat")
            .extends("animal")
            .field(FieldDefinition::string("chip").unique().not_null()),
    )
    .unwrap();

    let spec = cat.collection_spec();
    assert_eq!(spec.name, "animal");
    assert!(spec.unique_fields.is_empty());
    assert_eq!(spec.not_null_fields, vec!["name".to_string()]);
}

#[test]
fn defaults_fill_missing_and_null_values_only() {
    let mut registry = Registry::new();
    let schema = define(
        &mut registry,
        SchemaDefinition::new("t")
            .field(FieldDefinition::number("rating").default_value(4.5))
            .field(FieldDefinition::boolean("active").default_value(true))
            .field(FieldDefinition::string("plain")),
    )
    .unwrap();

    let mut doc = json!({"active": false, "rating": null}).as_object().cloned().unwrap();
    schema.apply_defaults(&mut doc);
    assert_eq!(doc.get("rating"), Some(&json!(4.5)));
    assert_eq!(doc.get("active"), Some(&json!(false)));
    assert!(!doc.contains_key("plain"));
}

#[test]
fn value_interception_skips_structured_and_unknown() {
    let mut registry = Registry::new();
    let schema = define(
        &mut registry,
        SchemaDefinition::new("t")
            .field(FieldDefinition::integer("n"))
            .field(FieldDefinition::json("meta")),
    )
    .unwrap();
    let ctx = OperationContext::new();

    assert_eq!(schema.intercept_value("n", json!("42"), &ctx), json!(42));
    assert_eq!(schema.intercept_value("n", json!({"$gt": "1"}), &ctx), json!({"$gt": "1"}));
    assert_eq!(schema.intercept_value("other", json!("42"), &ctx), json!("42"));

    let mut doc = json!({"n": "7", "meta": "7", "extra": "7"}).as_object().cloned().unwrap();
    schema.intercept_document(&mut doc, &ctx);
    assert_eq!(doc.get("n"), Some(&json!(7)));
    assert_eq!(doc.get("meta"), Some(&json!("7")));
    assert_eq!(doc.get("extra"), Some(&json!("7")));
}

#[test]
fn hydrate_repairs_driver_values() {
    let mut registry = Registry::new();
    let schema = define(
        &mut registry,
        SchemaDefinition::new("t")
            .field(FieldDefinition::integer("count"))
            .field(FieldDefinition::number("price")),
    )
    .unwrap();
    let raw = json!({"count": "12", "price": "9.5", "other": "x"}).as_object().cloned().unwrap();
    let hydrated = schema.hydrate(raw, &OperationContext::new());
    assert_eq!(hydrated.get("count"), Some(&json!(12)));
    assert_eq!(hydrated.get("price"), Some(&json!(9.5)));
    assert_eq!(hydrated.get("other"), Some(&json!("x")));
}
