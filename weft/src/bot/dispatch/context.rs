//! Per-update context: a keyed map threaded through rules, middlewares,
//! handlers and return managers.
//!
//! Values are type-erased and shared (`Arc`), so `copy()` is shallow: a
//! handler or rule fills a copy speculatively and the caller merges it back
//! only when the containing check succeeds.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::Update;

/// Reserved slot for the per-event node store (see [`crate::node`]).
pub const CONTEXT_STORE_NODES_KEY: &str = "__weft_node_store";

/// Reserved slot for a translator handle (see [`crate::i18n`]).
pub const I18N_KEY: &str = "__weft_translator";

/// Reserved slot for the normalized bound update reused across rule checks.
pub const CACHED_BOUND_UPDATE_KEY: &str = "__weft_bound_update";

/// Shared, type-erased context value.
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// Keyed state for one update's trip through the pipeline.
#[derive(Clone)]
pub struct Context {
    raw_update: Arc<Update>,
    entries: HashMap<String, ContextValue>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Context")
            .field("update_id", &self.raw_update.update_id)
            .field("keys", &keys)
            .finish()
    }
}

impl Context {
    pub fn new(raw_update: Arc<Update>) -> Self {
        Self {
            raw_update,
            entries: HashMap::new(),
        }
    }

    /// The originating update this context belongs to.
    pub fn raw_update(&self) -> Arc<Update> {
        self.raw_update.clone()
    }

    /// Typed lookup; `None` when the key is absent or holds another type.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.entries.get(key).cloned().and_then(|v| v.downcast::<T>().ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Arc::new(value));
    }

    pub fn set_arc(&mut self, key: impl Into<String>, value: ContextValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.entries.remove(key)
    }

    /// Returns the value under `key`, installing `factory()` first when absent.
    pub fn get_or_set<T: Send + Sync + 'static>(
        &mut self,
        key: &str,
        factory: impl FnOnce() -> T,
    ) -> Arc<T> {
        if let Some(existing) = self.get::<T>(key) {
            return existing;
        }
        let value = Arc::new(factory());
        self.entries.insert(key.to_string(), value.clone());
        value
    }

    /// Shallow copy: same update, entry map cloned, values shared.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Merge semantics of `|=`: entries of `other` overwrite this map.
    pub fn merge(&mut self, other: Context) {
        self.entries.extend(other.entries);
    }
}
