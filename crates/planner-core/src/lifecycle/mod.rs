//! Task lifecycle manager: every mutation a plan goes through after creation.
//!
//! Each operation loads the plan through the [`PlanStore`], edits a copy of
//! its stage data, and saves the result back. Operations never return
//! errors. An unknown plan or sub-id, or a failed save, yields `false`
//! (or `None` for operations that create something) and is logged.
//!
//! Operations are grouped by concern:
//! - [`tasks`]: heuristic-to-factor mappings, stage tasks, policy tasks
//! - [`heuristics`]: personal heuristics, factor ratings, reference seeding
//! - [`good_practice`]: zone, frameworks, good-practice tasks, custom
//!   frameworks

pub mod good_practice;
pub mod heuristics;
pub mod tasks;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::{PlanId, Stages};
use crate::store::{PlanPatch, PlanStore, StoreError};

/// Mutates plans held by a [`PlanStore`].
#[derive(Debug, Clone)]
pub struct TaskLifecycle {
    store: Arc<PlanStore>,
}

impl TaskLifecycle {
    pub fn new(store: Arc<PlanStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<PlanStore> {
        &self.store
    }

    /// Load `plan_id`, apply `edit` to its stages and save.
    ///
    /// `edit` returns `None` when its target does not exist; nothing is
    /// saved in that case.
    async fn mutate<T>(
        &self,
        plan_id: PlanId,
        op: &'static str,
        edit: impl FnOnce(&mut Stages) -> Option<T>,
    ) -> Option<T> {
        let record = match self.store.load(plan_id).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                debug!(plan_id = %plan_id, op, "plan not found");
                return None;
            }
            Err(e) => {
                warn!(plan_id = %plan_id, op, error = %e, "failed to load plan");
                return None;
            }
        };

        let mut stages = record.stages;
        let Some(out) = edit(&mut stages) else {
            debug!(plan_id = %plan_id, op, "target not found, nothing saved");
            return None;
        };

        match self.store.save(plan_id, PlanPatch::stages(stages)).await {
            Ok(_) => {
                debug!(plan_id = %plan_id, op, "plan updated");
                Some(out)
            }
            Err(e) => {
                warn!(plan_id = %plan_id, op, error = %e, "failed to save plan");
                None
            }
        }
    }
}
