//! The operation interceptor pipeline.
//!
//! Interceptors are registered once on an [`InterceptorRegistry`] shared by
//! every collection of an [`Odm`](crate::Odm). Each operation runs the chain
//! twice: BEFORE the operation executes (where a hook may rewrite the record
//! set or cancel the operation outright) and AFTER it (where a hook may
//! transform what reaches the caller).
//!
//! Hooks run strictly one after another, in ascending [`Interceptor::order`];
//! ties keep registration order. A hook can be skipped for a single handle
//! through [`Suppression`], which is consulted before every invocation.

use crate::error::{OdmError, OdmResult};
use crate::record::Record;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use strata_types::{OperationContext, OperationType, OperationWhen};
use tracing::debug;

/// A named, ordered hook wrapped around every operation.
///
/// Returning `Ok(None)`, or an empty vector for a non-empty input, halts the
/// chain. In the BEFORE phase that cancels the operation before storage is
/// touched.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Registration identity. Adding another interceptor with the same name
    /// replaces this one.
    fn name(&self) -> &str;

    /// Run priority; lower runs first.
    fn order(&self) -> i32 {
        0
    }

    async fn intercept(
        &self,
        collection: &str,
        operation: OperationType,
        when: OperationWhen,
        records: Vec<Record>,
        context: &OperationContext,
    ) -> anyhow::Result<Option<Vec<Record>>>;
}

/// Which interceptors a handle skips.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Suppression {
    #[default]
    None,
    /// Every interceptor is skipped.
    All,
    /// Interceptors with these names are skipped.
    Names(BTreeSet<String>),
}

impl Suppression {
    pub fn is_suppressed(&self, name: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Names(names) => names.contains(name),
        }
    }

    /// Adds `name` to the skipped set.
    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        match self {
            Self::None => Self::Names(BTreeSet::from([name.into()])),
            Self::All => Self::All,
            Self::Names(mut names) => {
                names.insert(name.into());
                Self::Names(names)
            }
        }
    }
}

/// Outcome of one phase of the chain.
#[derive(Debug)]
pub enum Interception {
    /// Every hook ran (or was skipped); these are the resulting records.
    Continue(Vec<Record>),
    /// The named hook returned an empty result.
    Halted { by: String },
}

struct Registered {
    seq: u64,
    interceptor: Arc<dyn Interceptor>,
}

#[derive(Default)]
struct Entries {
    list: Vec<Registered>,
    next_seq: u64,
}

/// Process-scoped set of interceptors, injected into every collection.
#[derive(Default)]
pub struct InterceptorRegistry {
    entries: RwLock<Entries>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `interceptor`, returning the one it replaced. A replacement
    /// keeps the registration position of the interceptor it replaces.
    pub fn add(&self, interceptor: Arc<dyn Interceptor>) -> Option<Arc<dyn Interceptor>> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries
            .list
            .iter_mut()
            .find(|e| e.interceptor.name() == interceptor.name())
        {
            debug!(interceptor = interceptor.name(), "replacing interceptor");
            return Some(std::mem::replace(&mut existing.interceptor, interceptor));
        }

        debug!(interceptor = interceptor.name(), order = interceptor.order(), "adding interceptor");
        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.list.push(Registered { seq, interceptor });
        None
    }

    /// Removes the interceptor called `name`. Returns whether one was registered.
    pub fn delete(&self, name: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.list.len();
        entries.list.retain(|e| e.interceptor.name() != name);
        before != entries.list.len()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Interceptor>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .list
            .iter()
            .find(|e| e.interceptor.name() == name)
            .map(|e| Arc::clone(&e.interceptor))
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).list.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered interceptors in the order they run.
    pub fn ordered(&self) -> Vec<Arc<dyn Interceptor>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keyed: Vec<(i32, u64, Arc<dyn Interceptor>)> = entries
            .list
            .iter()
            .map(|e| (e.interceptor.order(), e.seq, Arc::clone(&e.interceptor)))
            .collect();
        keyed.sort_by_key(|(order, seq, _)| (*order, *seq));
        keyed.into_iter().map(|(_, _, interceptor)| interceptor).collect()
    }

    /// Names of the registered interceptors in the order they run.
    pub fn names(&self) -> Vec<String> {
        self.ordered().iter().map(|i| i.name().to_string()).collect()
    }

    /// Runs one phase of the chain over `records`.
    ///
    /// The chain is snapshotted when the phase starts. A hook error aborts
    /// the phase and is returned as [`OdmError::Interceptor`].
    pub async fn run(
        &self,
        collection: &str,
        operation: OperationType,
        when: OperationWhen,
        mut records: Vec<Record>,
        context: &OperationContext,
        suppression: &Suppression,
    ) -> OdmResult<Interception> {
        for interceptor in self.ordered() {
            let name = interceptor.name();
            if suppression.is_suppressed(name) {
                debug!(interceptor = name, collection, %operation, %when, "interceptor suppressed");
                continue;
            }

            debug!(interceptor = name, collection, %operation, %when, records = records.len(), "running interceptor");
            let had_records = !records.is_empty();
            let result = interceptor
                .intercept(collection, operation, when, records, context)
                .await
                .map_err(|source| OdmError::Interceptor {
                    name: name.to_string(),
                    source,
                })?;

            match result {
                Some(next) if !(had_records && next.is_empty()) => records = next,
                _ => {
                    debug!(interceptor = name, collection, %operation, %when, "interceptor halted operation");
                    return Ok(Interception::Halted { by: name.to_string() });
                }
            }
        }
        Ok(Interception::Continue(records))
    }
}
