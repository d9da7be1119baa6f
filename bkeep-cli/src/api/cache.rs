//! Keyed cache for list queries shared across commands
//!
//! An import only invalidates entries here; whoever owns a key decides
//! whether to refetch it.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

/// Cache key for the chart of accounts list
pub const ACCOUNTS_KEY: &str = "accounts";

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<String, Value>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: &str, value: Value) {
        self.entries.write().await.insert(key.to_string(), value);
    }

    /// Drop an entry. Returns whether anything was cached.
    pub async fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        log::debug!("Invalidated query cache '{}' (was cached: {})", key, removed);
        removed
    }
}
