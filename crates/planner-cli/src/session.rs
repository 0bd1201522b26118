//! Opens the plan store for the configured backend.

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use tracing::debug;

use planner_core::store::{JsonFileAdapter, PgAdapter, PersistenceAdapter, PlanStore};
use planner_core::{ParentAggregator, TaskLifecycle};
use planner_db::pool;

use crate::config::{Backend, PlannerConfig};

/// A store plus whatever connection it holds. Call [`Session::close`] when
/// the command is done.
pub struct Session {
    pub store: Arc<PlanStore>,
    pool: Option<PgPool>,
}

impl Session {
    pub async fn open(config: &PlannerConfig) -> Result<Self> {
        let (adapter, pool): (Arc<dyn PersistenceAdapter>, Option<PgPool>) = match config.backend
        {
            Backend::File => {
                debug!(dir = %config.data_dir.display(), "using file storage");
                (Arc::new(JsonFileAdapter::new(&config.data_dir)), None)
            }
            Backend::Postgres => {
                let db_pool = pool::create_pool(&config.db_config).await?;
                (Arc::new(PgAdapter::new(db_pool.clone())), Some(db_pool))
            }
        };
        Ok(Self {
            store: Arc::new(PlanStore::new(adapter)),
            pool,
        })
    }

    pub fn lifecycle(&self) -> TaskLifecycle {
        TaskLifecycle::new(self.store.clone())
    }

    pub fn aggregator(&self) -> ParentAggregator {
        ParentAggregator::new(self.store.clone())
    }

    pub async fn close(self) {
        if let Some(pool) = self.pool {
            pool.close().await;
        }
    }
}
