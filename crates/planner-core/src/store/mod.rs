//! Plan record store.
//!
//! [`PlanStore`] owns the in-memory cache of plan records and shadows every
//! write to a [`PersistenceAdapter`]. Its lifetime belongs to the caller:
//! construct one per process, session, or test and drop it when done.
//!
//! Writes update the cache before the adapter call is awaited, so a `load`
//! issued while a save is in flight sees the new value. If the adapter
//! write then fails, the cache entry is rolled back to what it was before
//! the call, unless another save has replaced it in the meantime.

pub mod adapter;
pub mod file;
pub mod postgres;

pub use adapter::{MemoryAdapter, PersistenceAdapter};
pub use file::JsonFileAdapter;
pub use postgres::PgAdapter;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::{PlanId, PlanRecord, Stages};

/// Errors returned by [`PlanStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("plan {0} not found")]
    NotFound(PlanId),

    #[error("persistence unavailable ({backend}) for {key:?}: {message}")]
    Persistence {
        backend: String,
        key: String,
        message: String,
    },

    #[error("{backend} did not respond within {after:?} for {key:?}")]
    Timeout {
        backend: String,
        key: String,
        after: Duration,
    },

    #[error("malformed plan record under {key:?}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Store settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Prepended to the plan id to form the persistence key.
    pub key_prefix: String,
    /// Upper bound on any single adapter call.
    pub adapter_timeout: Duration,
}

impl StoreConfig {
    pub const DEFAULT_PREFIX: &str = "plan:";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: Self::DEFAULT_PREFIX.to_string(),
            adapter_timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// A shallow, top-level patch for [`PlanStore::save`].
///
/// Supplied fields replace the record's fields; `stages` is replaced
/// wholesale. Keys in `extra` overwrite the record's unknown fields one by
/// one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub stages: Option<Stages>,
    pub extra: Map<String, Value>,
}

impl PlanPatch {
    /// A patch that replaces only the stage data.
    pub fn stages(stages: Stages) -> Self {
        Self {
            stages: Some(stages),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Merge this patch onto `record`. Does not touch `last_updated`.
    pub fn apply_to(self, mut record: PlanRecord) -> PlanRecord {
        if let Some(name) = self.name {
            record.name = Some(name);
        }
        if let Some(description) = self.description {
            record.description = Some(description);
        }
        if let Some(stages) = self.stages {
            record.stages = stages;
        }
        record.extra.extend(self.extra);
        record
    }
}

/// The canonical owner of plan records.
pub struct PlanStore {
    adapter: Arc<dyn PersistenceAdapter>,
    config: StoreConfig,
    cache: Mutex<HashMap<PlanId, PlanRecord>>,
}

impl PlanStore {
    pub fn new(adapter: Arc<dyn PersistenceAdapter>) -> Self {
        Self::with_config(adapter, StoreConfig::default())
    }

    pub fn with_config(adapter: Arc<dyn PersistenceAdapter>, config: StoreConfig) -> Self {
        Self {
            adapter,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &str {
        self.adapter.name()
    }

    /// Persistence key for a plan: `<prefix><id>`.
    pub fn key_for(&self, id: PlanId) -> String {
        format!("{}{}", self.config.key_prefix, id)
    }

    /// Create a plan with empty data for every stage and persist it.
    pub async fn create(
        &self,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<PlanId, StoreError> {
        let id = Uuid::new_v4();
        let record = PlanRecord::new(id, name.map(str::to_owned), description.map(str::to_owned));

        self.cache().insert(id, record.clone());
        if let Err(e) = self.persist(&record).await {
            self.cache().remove(&id);
            return Err(e);
        }

        info!(plan_id = %id, backend = self.backend(), "plan created");
        Ok(id)
    }

    /// Return the cached record, or fetch it from persistence.
    pub async fn load(&self, id: PlanId) -> Result<PlanRecord, StoreError> {
        let cached = self.cache().get(&id).cloned();
        if let Some(record) = cached {
            return Ok(record);
        }

        match self.fetch(id).await? {
            Some(record) => {
                debug!(plan_id = %id, "plan loaded from persistence");
                // A save may have populated the entry while we were fetching.
                let record = self.cache().entry(id).or_insert(record).clone();
                Ok(record)
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    /// Load several plans concurrently. Results are in input order.
    pub async fn load_many(&self, ids: &[PlanId]) -> Vec<Result<PlanRecord, StoreError>> {
        join_all(ids.iter().map(|&id| self.load(id))).await
    }

    /// Merge `patch` onto the plan, stamp `last_updated`, cache, persist.
    ///
    /// When the plan is not cached it is fetched from persistence first; a
    /// default record is only synthesized when persistence has no entry.
    /// A failed fetch fails the save rather than risk overwriting the
    /// persisted record with defaults.
    pub async fn save(&self, id: PlanId, patch: PlanPatch) -> Result<PlanRecord, StoreError> {
        let cached = self.cache().get(&id).cloned();
        let base = match cached {
            Some(record) => record,
            None => match self.fetch(id).await? {
                Some(record) => {
                    debug!(plan_id = %id, "save recovered plan from persistence");
                    record
                }
                None => {
                    info!(plan_id = %id, "save for unknown plan, starting from defaults");
                    PlanRecord::new(id, None, None)
                }
            },
        };

        let mut record = patch.apply_to(base);
        record.last_updated = Utc::now();

        let previous = self.cache().insert(id, record.clone());
        if let Err(e) = self.persist(&record).await {
            let mut cache = self.cache();
            if cache.get(&id) == Some(&record) {
                match previous {
                    Some(previous) => cache.insert(id, previous),
                    None => cache.remove(&id),
                };
            }
            return Err(e);
        }

        Ok(record)
    }

    /// Ids of every persisted plan. Keys whose suffix is not a plan id are
    /// skipped.
    pub async fn list(&self) -> Result<Vec<PlanId>, StoreError> {
        let prefix = self.config.key_prefix.as_str();
        let keys = self.bounded(prefix, self.adapter.list(prefix)).await?;

        Ok(keys
            .iter()
            .filter_map(|key| {
                let suffix = key.strip_prefix(prefix)?;
                match Uuid::parse_str(suffix) {
                    Ok(id) => Some(id),
                    Err(_) => {
                        warn!(key = %key, "skipping key that is not a plan id");
                        None
                    }
                }
            })
            .collect())
    }

    /// Delete a plan from persistence and the cache. Returns whether it
    /// existed.
    pub async fn delete(&self, id: PlanId) -> Result<bool, StoreError> {
        let key = self.key_for(id);
        let cached = self.cache().contains_key(&id);
        let existed = cached || self.bounded(&key, self.adapter.get(&key)).await?.is_some();

        self.bounded(&key, self.adapter.delete(&key)).await?;
        self.cache().remove(&id);

        if existed {
            info!(plan_id = %id, "plan deleted");
        }
        Ok(existed)
    }

    /// Drop a plan from the cache only. Returns whether it was cached.
    pub fn evict(&self, id: PlanId) -> bool {
        self.cache().remove(&id).is_some()
    }

    /// The cached copy of a plan, without touching persistence.
    pub fn cached(&self, id: PlanId) -> Option<PlanRecord> {
        self.cache().get(&id).cloned()
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<PlanId, PlanRecord>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(&self, id: PlanId) -> Result<Option<PlanRecord>, StoreError> {
        let key = self.key_for(id);
        let Some(value) = self.bounded(&key, self.adapter.get(&key)).await? else {
            return Ok(None);
        };
        let record = serde_json::from_value(value)
            .map_err(|source| StoreError::Corrupt { key, source })?;
        Ok(Some(record))
    }

    async fn persist(&self, record: &PlanRecord) -> Result<(), StoreError> {
        let key = self.key_for(record.id);
        let value = serde_json::to_value(record).map_err(|source| StoreError::Corrupt {
            key: key.clone(),
            source,
        })?;
        self.bounded(&key, self.adapter.set(&key, value)).await
    }

    /// Run an adapter call under the configured timeout, logging failures.
    async fn bounded<T>(
        &self,
        key: &str,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.config.adapter_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                let message = format!("{e:#}");
                warn!(backend = self.backend(), key, error = %message, "persistence call failed");
                Err(StoreError::Persistence {
                    backend: self.backend().to_string(),
                    key: key.to_string(),
                    message,
                })
            }
            Err(_) => {
                warn!(
                    backend = self.backend(),
                    key,
                    timeout = ?self.config.adapter_timeout,
                    "persistence call timed out"
                );
                Err(StoreError::Timeout {
                    backend: self.backend().to_string(),
                    key: key.to_string(),
                    after: self.config.adapter_timeout,
                })
            }
        }
    }
}

impl std::fmt::Debug for PlanStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanStore")
            .field("backend", &self.adapter.name())
            .field("config", &self.config)
            .field("cached", &self.cache().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> PlanRecord {
        let mut record = PlanRecord::new(Uuid::new_v4(), Some("Original".into()), None);
        record.extra.insert("owner".into(), json!("estates"));
        record.extra.insert("budget".into(), json!(100));
        record
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let before = record();
        let after = PlanPatch::default().apply_to(before.clone());
        assert_eq!(after, before);
    }

    #[test]
    fn patch_replaces_supplied_fields_only() {
        let before = record();
        let after = PlanPatch::default()
            .with_description("Move two depots")
            .apply_to(before.clone());
        assert_eq!(after.name.as_deref(), Some("Original"));
        assert_eq!(after.description.as_deref(), Some("Move two depots"));
        assert_eq!(after.stages, before.stages);
    }

    #[test]
    fn patch_replaces_stages_wholesale() {
        let mut before = record();
        before.stages.closure.good_practice.frameworks.push("Scrum".into());

        let mut stages = Stages::default();
        stages.identification.good_practice.frameworks.push("Lean".into());
        let after = PlanPatch::stages(stages.clone()).apply_to(before);

        assert_eq!(after.stages, stages);
        assert!(after.stages.closure.good_practice.frameworks.is_empty());
    }

    #[test]
    fn patch_merges_unknown_fields_by_key() {
        let after = PlanPatch::default()
            .with_field("budget", json!(250))
            .with_field("region", json!("north"))
            .apply_to(record());
        assert_eq!(after.extra["owner"], json!("estates"));
        assert_eq!(after.extra["budget"], json!(250));
        assert_eq!(after.extra["region"], json!("north"));
    }

    #[test]
    fn key_uses_configured_prefix() {
        let store = PlanStore::with_config(
            Arc::new(MemoryAdapter::new()),
            StoreConfig {
                key_prefix: "tcof:".into(),
                ..StoreConfig::default()
            },
        );
        let id = Uuid::nil();
        assert_eq!(store.key_for(id), format!("tcof:{id}"));
    }
}
