use crate::collection::{Collection, CollectionInner};
use crate::config::OdmConfig;
use crate::error::{OdmError, OdmResult};
use crate::intercept::{Interceptor, InterceptorRegistry};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use strata_model::{
    DefinitionError, FieldType, FieldTypeRegistry, Schema, SchemaDefinition, SchemaLookup,
};
use strata_storage::Backend;
use strata_types::RecordId;
use tracing::{debug, info};

/// Maps entity names to their live handles.
#[derive(Default)]
struct CollectionRegistry {
    collections: HashMap<String, Collection>,
    /// Names whose host store is being prepared, with the parent they extend.
    pending: HashMap<String, Option<String>>,
}

impl CollectionRegistry {
    /// First registered or pending schema (by name) that directly extends `name`.
    fn subtype_of(&self, name: &str) -> Option<&str> {
        let registered = self
            .collections
            .values()
            .filter(|c| c.schema().extends() == Some(name))
            .map(Collection::name);
        let pending = self
            .pending
            .iter()
            .filter(|(_, parent)| parent.as_deref() == Some(name))
            .map(|(child, _)| child.as_str());
        registered.chain(pending).min()
    }

    /// Claims the name of `schema` until its host store is ready. Fails when
    /// another definition registered or claimed it first, or when the parent
    /// went away since resolution.
    fn reserve(&mut self, schema: &Schema) -> Result<(), DefinitionError> {
        let name = schema.name();
        if self.collections.contains_key(name) || self.pending.contains_key(name) {
            return Err(DefinitionError::DuplicateSchema(name.to_string()));
        }
        if let Some(parent) = schema.extends().filter(|p| !self.collections.contains_key(*p)) {
            return Err(DefinitionError::UnknownParent {
                schema: name.to_string(),
                parent: parent.to_string(),
            });
        }
        self.pending
            .insert(name.to_string(), schema.extends().map(str::to_string));
        Ok(())
    }
}

impl SchemaLookup for CollectionRegistry {
    fn schema(&self, name: &str) -> Option<Arc<Schema>> {
        self.collections.get(name).map(|c| Arc::clone(c.schema()))
    }

    fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }
}

/// Entry point: owns the field kind, interceptor and collection registries
/// and the backend every collection talks to.
///
/// There is no global state; two `Odm` instances are fully independent.
pub struct Odm {
    backend: Arc<dyn Backend>,
    config: Arc<OdmConfig>,
    field_types: FieldTypeRegistry,
    interceptors: Arc<InterceptorRegistry>,
    collections: RwLock<CollectionRegistry>,
}

impl Odm {
    /// Creates an instance with the default configuration and every
    /// built-in field kind.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_config(backend, OdmConfig::default())
    }

    pub fn with_config(backend: Arc<dyn Backend>, config: OdmConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            field_types: FieldTypeRegistry::with_defaults(),
            interceptors: Arc::new(InterceptorRegistry::new()),
            collections: RwLock::new(CollectionRegistry::default()),
        }
    }

    pub fn config(&self) -> &OdmConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    fn read_collections(&self) -> RwLockReadGuard<'_, CollectionRegistry> {
        self.collections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_collections(&self) -> RwLockWriteGuard<'_, CollectionRegistry> {
        self.collections.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Field kinds ──────────────────────────────────────────────

    pub fn field_types(&self) -> &FieldTypeRegistry {
        &self.field_types
    }

    /// Registers a custom field kind, returning the kind it replaced.
    /// Schemas defined earlier keep the kind they were resolved with.
    pub fn register_field_type(&self, kind: Arc<dyn FieldType>) -> Option<Arc<dyn FieldType>> {
        info!(field_type = kind.name(), "registering field type");
        self.field_types.register(kind)
    }

    // ── Interceptors ─────────────────────────────────────────────

    pub fn interceptors(&self) -> &Arc<InterceptorRegistry> {
        &self.interceptors
    }

    /// Registers an interceptor for every collection, returning the one with
    /// the same name it replaced.
    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) -> Option<Arc<dyn Interceptor>> {
        self.interceptors.add(interceptor)
    }

    pub fn delete_interceptor(&self, name: &str) -> bool {
        self.interceptors.delete(name)
    }

    pub fn clear_interceptors(&self) {
        self.interceptors.clear();
    }

    // ── Collections ──────────────────────────────────────────────

    /// Validates `definition`, prepares its host store and registers the
    /// collection.
    ///
    /// Nothing is registered when any step fails, and the backend is never
    /// touched for a definition that loses a race for its name.
    pub async fn define_collection(&self, definition: SchemaDefinition) -> OdmResult<Collection> {
        let schema = {
            let mut collections = self.write_collections();
            let schema = Schema::resolve(definition, &self.field_types, &*collections)?;
            collections.reserve(&schema)?;
            schema
        };

        let spec = schema.collection_spec();
        debug!(
            collection = schema.name(),
            host = %spec.name,
            unique = ?spec.unique_fields,
            not_null = ?spec.not_null_fields,
            "preparing host store"
        );
        let prepared = self.backend.ensure_collection(&spec).await;

        let mut collections = self.write_collections();
        let name = schema.name().to_string();
        collections.pending.remove(&name);
        prepared?;

        info!(
            collection = %name,
            host = schema.host_name(),
            fields = schema.fields().len(),
            "collection defined"
        );
        let collection = Collection::new(CollectionInner {
            schema: Arc::new(schema),
            backend: Arc::clone(&self.backend),
            interceptors: Arc::clone(&self.interceptors),
            config: Arc::clone(&self.config),
        });
        collections.collections.insert(name, collection.clone());
        Ok(collection)
    }

    /// The default handle of a defined collection.
    pub fn collection(&self, name: &str) -> Option<Collection> {
        self.read_collections().collections.get(name).cloned()
    }

    /// Like [`collection`](Odm::collection), failing for unknown names.
    pub fn require_collection(&self, name: &str) -> OdmResult<Collection> {
        self.collection(name)
            .ok_or_else(|| OdmError::CollectionNotFound(name.to_string()))
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.read_collections().contains(name)
    }

    /// Names of every defined collection, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_collections().collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Unregisters a collection. A root collection also drops its host store;
    /// a subtype leaves the shared store in place.
    ///
    /// Refused while another collection extends it. Records created through
    /// the collection fail with [`OdmError::CollectionDropped`] once every
    /// handle is gone.
    pub async fn drop_collection(&self, name: &str) -> OdmResult<()> {
        let collection = {
            let collections = self.read_collections();
            let collection = collections
                .collections
                .get(name)
                .cloned()
                .ok_or_else(|| OdmError::CollectionNotFound(name.to_string()))?;
            if let Some(child) = collections.subtype_of(name) {
                return Err(DefinitionError::HasSubtypes {
                    schema: name.to_string(),
                    child: child.to_string(),
                }
                .into());
            }
            collection
        };

        if collection.schema().is_root() {
            self.backend.drop_collection(collection.host_name()).await?;
        }
        self.write_collections().collections.remove(name);
        info!(collection = name, "collection dropped");
        Ok(())
    }

    /// A fresh record identity (UUID v7).
    pub fn generate_record_id(&self) -> RecordId {
        RecordId::new()
    }
}
