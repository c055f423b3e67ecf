//! Optional pluggable state storage for per-user state views.
//!
//! The core itself persists nothing; applications can plug an
//! implementation over string keys.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

/// `{get, set, delete}` over string keys.
#[async_trait]
pub trait StateStorage: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value);

    async fn delete(&self, key: &str);
}

/// Process-local storage; useful as a default and in tests.
#[derive(Default)]
pub struct InMemoryStateStorage {
    entries: DashMap<String, Value>,
}

impl InMemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStorage for InMemoryStateStorage {
    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    async fn set(&self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    async fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}
