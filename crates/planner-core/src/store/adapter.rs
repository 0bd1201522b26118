//! The `PersistenceAdapter` trait -- the key-value seam behind the plan store.
//!
//! The trait is object-safe so the store can hold an
//! `Arc<dyn PersistenceAdapter>` and callers can choose the backend at
//! runtime.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// Asynchronous key-value storage for serialized plan records.
///
/// Every method may fail transiently. The store treats failures as
/// load/save failures, never as fatal errors.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Short backend name for logs (e.g. "memory", "postgres").
    fn name(&self) -> &str;

    /// Fetch the value under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Insert or replace the value under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// All keys starting with `prefix`, in ascending order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PersistenceAdapter) {}
};

/// In-process adapter backed by an ordered map.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
