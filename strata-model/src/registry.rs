use crate::field_type::FieldType;
use crate::field_types;
use crate::schema::Schema;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Maps a type tag to its field kind. The single extension point for new
/// field kinds.
pub struct FieldTypeRegistry {
    kinds: RwLock<HashMap<String, Arc<dyn FieldType>>>,
}

impl Default for FieldTypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FieldTypeRegistry {
    /// Creates a registry with no kinds at all.
    pub fn empty() -> Self {
        Self {
            kinds: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry holding every built-in kind.
    pub fn with_defaults() -> Self {
        let registry = Self::empty();
        for kind in field_types::defaults() {
            registry.register(kind);
        }
        registry
    }

    /// Registers a kind under its own name, returning the kind it replaced.
    pub fn register(&self, kind: Arc<dyn FieldType>) -> Option<Arc<dyn FieldType>> {
        let name = kind.name().to_string();
        self.kinds
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, kind)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FieldType>> {
        self.kinds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered type tags, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .kinds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// Read access to already-defined schemas, used to resolve `extends`.
pub trait SchemaLookup {
    fn schema(&self, name: &str) -> Option<Arc<Schema>>;

    fn contains(&self, name: &str) -> bool {
        self.schema(name).is_some()
    }
}

impl SchemaLookup for HashMap<String, Arc<Schema>> {
    fn schema(&self, name: &str) -> Option<Arc<Schema>> {
        self.get(name).cloned()
    }
}
