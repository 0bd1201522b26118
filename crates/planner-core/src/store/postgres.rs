//! PostgreSQL adapter over the `plan_records` table.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use planner_db::queries::records;

use super::adapter::PersistenceAdapter;

/// Adapter storing each key as a JSONB row. Request timeouts come from the
/// pool's acquire timeout and the store's adapter timeout.
#[derive(Debug, Clone)]
pub struct PgAdapter {
    pool: PgPool,
}

impl PgAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PersistenceAdapter for PgAdapter {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        records::get_record(&self.pool, key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        records::upsert_record(&self.pool, key, &value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        records::delete_record(&self.pool, key).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        records::list_keys(&self.pool, prefix).await
    }
}
