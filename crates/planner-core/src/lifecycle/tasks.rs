//! Mappings, stage tasks and policy tasks.

use crate::model::{Mapping, NewTask, PlanId, PolicyTask, Stage, TaskItem, TaskUpdate, new_id};
use crate::naming;

use super::TaskLifecycle;

impl TaskLifecycle {
    /// Map a heuristic to a success factor (or to none) in one stage.
    ///
    /// A heuristic has at most one mapping per stage, so an existing mapping
    /// for `heuristic_id` is replaced.
    pub async fn add_mapping(
        &self,
        plan_id: PlanId,
        heuristic_id: &str,
        factor_id: Option<&str>,
        stage: Stage,
    ) -> bool {
        self.mutate(plan_id, "add_mapping", |stages| {
            let mappings = &mut stages.get_mut(stage).mappings;
            let factor_id = factor_id.map(str::to_owned);
            match mappings.iter_mut().find(|m| m.heuristic_id == heuristic_id) {
                Some(mapping) => mapping.factor_id = factor_id,
                None => mappings.push(Mapping {
                    heuristic_id: heuristic_id.to_owned(),
                    factor_id,
                    extra: Default::default(),
                }),
            }
            Some(())
        })
        .await
        .is_some()
    }

    pub async fn remove_mapping(&self, plan_id: PlanId, heuristic_id: &str, stage: Stage) -> bool {
        self.mutate(plan_id, "remove_mapping", |stages| {
            let mappings = &mut stages.get_mut(stage).mappings;
            let before = mappings.len();
            mappings.retain(|m| m.heuristic_id != heuristic_id);
            (mappings.len() != before).then_some(())
        })
        .await
        .is_some()
    }

    /// Append a task to a stage and return its id.
    ///
    /// Text arriving in encoded display form is stored raw. Tasks are not
    /// de-duplicated: adding the same text twice yields two tasks.
    pub async fn add_task(&self, plan_id: PlanId, task: NewTask, stage: Stage) -> Option<String> {
        self.mutate(plan_id, "add_task", |stages| {
            let id = new_id();
            stages.get_mut(stage).tasks.push(TaskItem {
                id: id.clone(),
                text: naming::decode(&task.text).to_owned(),
                stage,
                origin: task.origin,
                source_id: task.source_id,
                completed: task.completed,
                notes: task.notes,
                priority: task.priority,
                due_date: task.due_date,
                extra: Default::default(),
            });
            Some(id)
        })
        .await
    }

    /// Set the completion flag of a task. The task is looked up in `stage`
    /// only.
    pub async fn update_task_status(
        &self,
        plan_id: PlanId,
        task_id: &str,
        completed: bool,
        stage: Stage,
    ) -> bool {
        self.mutate(plan_id, "update_task_status", |stages| {
            let task = stages
                .get_mut(stage)
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)?;
            task.completed = completed;
            Some(())
        })
        .await
        .is_some()
    }

    /// Apply field updates to a task. The id, stage and origin never change.
    pub async fn update_task(
        &self,
        plan_id: PlanId,
        task_id: &str,
        stage: Stage,
        update: TaskUpdate,
    ) -> bool {
        self.mutate(plan_id, "update_task", |stages| {
            let task = stages
                .get_mut(stage)
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)?;
            if let Some(text) = update.text {
                task.text = naming::decode(&text).to_owned();
            }
            if let Some(notes) = update.notes {
                task.notes = Some(notes);
            }
            if let Some(priority) = update.priority {
                task.priority = Some(priority);
            }
            if let Some(due_date) = update.due_date {
                task.due_date = Some(due_date);
            }
            Some(())
        })
        .await
        .is_some()
    }

    pub async fn remove_task(&self, plan_id: PlanId, task_id: &str, stage: Stage) -> bool {
        self.mutate(plan_id, "remove_task", |stages| {
            let tasks = &mut stages.get_mut(stage).tasks;
            let before = tasks.len();
            tasks.retain(|t| t.id != task_id);
            (tasks.len() != before).then_some(())
        })
        .await
        .is_some()
    }

    /// Append an organizational policy task to a stage and return its id.
    pub async fn add_policy_task(&self, plan_id: PlanId, text: &str, stage: Stage) -> Option<String> {
        self.mutate(plan_id, "add_policy_task", |stages| {
            let id = new_id();
            stages.get_mut(stage).policy_tasks.push(PolicyTask {
                id: id.clone(),
                text: naming::decode(text).to_owned(),
                stage,
                extra: Default::default(),
            });
            Some(id)
        })
        .await
    }

    /// Remove a policy task. Fails when no task with `task_id` exists in
    /// `stage`.
    pub async fn remove_policy_task(&self, plan_id: PlanId, task_id: &str, stage: Stage) -> bool {
        self.mutate(plan_id, "remove_policy_task", |stages| {
            let policy_tasks = &mut stages.get_mut(stage).policy_tasks;
            let before = policy_tasks.len();
            policy_tasks.retain(|t| t.id != task_id);
            (policy_tasks.len() != before).then_some(())
        })
        .await
        .is_some()
    }
}
