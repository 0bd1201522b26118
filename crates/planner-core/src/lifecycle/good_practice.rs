//! Zone, framework selection, good-practice tasks and custom frameworks.
//!
//! Zone, selected frameworks and custom frameworks are plan-wide but stored
//! in every stage's `good_practice`. Every operation here writes all four
//! copies so they never disagree.

use crate::model::{CustomFramework, GoodPracticeTask, PerStage, PlanId, Stage, new_id};
use crate::naming;
use crate::zone::Zone;

use super::TaskLifecycle;

impl TaskLifecycle {
    /// Set (or clear) the plan's zone in every stage.
    pub async fn set_zone(&self, plan_id: PlanId, zone: Option<Zone>) -> bool {
        self.mutate(plan_id, "set_zone", |stages| {
            for data in stages.values_mut() {
                data.good_practice.zone = zone;
            }
            Some(())
        })
        .await
        .is_some()
    }

    /// Select or deselect a framework in every stage.
    ///
    /// The framework counts as selected if any stage lists it. Deselecting
    /// also deletes every good-practice task carrying `code`, in every
    /// stage.
    pub async fn toggle_framework(&self, plan_id: PlanId, code: &str) -> bool {
        self.mutate(plan_id, "toggle_framework", |stages| {
            let selected = stages
                .iter()
                .any(|(_, data)| data.good_practice.frameworks.iter().any(|c| c == code));

            for data in stages.values_mut() {
                let gp = &mut data.good_practice;
                if selected {
                    gp.frameworks.retain(|c| c != code);
                    gp.tasks.retain(|t| t.framework_code != code);
                } else if !gp.frameworks.iter().any(|c| c == code) {
                    gp.frameworks.push(code.to_owned());
                }
            }
            Some(())
        })
        .await
        .is_some()
    }

    /// Add or remove the good-practice task `(text, code, stage)`.
    ///
    /// Toggling twice restores the original list; the re-added task gets a
    /// fresh id.
    pub async fn toggle_gp_task(&self, plan_id: PlanId, text: &str, code: &str, stage: Stage) -> bool {
        let text = naming::decode(text);
        self.mutate(plan_id, "toggle_gp_task", |stages| {
            let tasks = &mut stages.get_mut(stage).good_practice.tasks;
            let position = tasks
                .iter()
                .position(|t| t.text == text && t.framework_code == code && t.stage == stage);
            match position {
                Some(index) => {
                    tasks.remove(index);
                }
                None => tasks.push(GoodPracticeTask {
                    id: new_id(),
                    text: text.to_owned(),
                    stage,
                    framework_code: code.to_owned(),
                    completed: false,
                    extra: Default::default(),
                }),
            }
            Some(())
        })
        .await
        .is_some()
    }

    pub async fn update_gp_task_status(
        &self,
        plan_id: PlanId,
        task_id: &str,
        completed: bool,
        stage: Stage,
    ) -> bool {
        self.mutate(plan_id, "update_gp_task_status", |stages| {
            let task = stages
                .get_mut(stage)
                .good_practice
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)?;
            task.completed = completed;
            Some(())
        })
        .await
        .is_some()
    }

    /// Create an empty custom framework and return its id.
    pub async fn create_custom_framework(&self, plan_id: PlanId, name: &str) -> Option<String> {
        self.mutate(plan_id, "create_custom_framework", |stages| {
            let framework = CustomFramework {
                id: new_id(),
                name: name.to_owned(),
                tasks: PerStage::default(),
                extra: Default::default(),
            };
            for data in stages.values_mut() {
                data.good_practice.custom_frameworks.push(framework.clone());
            }
            Some(framework.id)
        })
        .await
    }

    /// Append a task string to a custom framework's list for `stage`.
    pub async fn add_task_to_custom_framework(
        &self,
        plan_id: PlanId,
        framework_id: &str,
        stage: Stage,
        text: &str,
    ) -> bool {
        self.mutate(plan_id, "add_task_to_custom_framework", |stages| {
            let mut found = false;
            for framework in custom_frameworks_mut(stages.values_mut(), framework_id) {
                framework.tasks.get_mut(stage).push(text.to_owned());
                found = true;
            }
            found.then_some(())
        })
        .await
        .is_some()
    }

    /// Remove the task at `index` from a custom framework's list for
    /// `stage`. Fails when the index is out of range.
    pub async fn remove_task_from_custom_framework(
        &self,
        plan_id: PlanId,
        framework_id: &str,
        stage: Stage,
        index: usize,
    ) -> bool {
        self.mutate(plan_id, "remove_task_from_custom_framework", |stages| {
            let mut removed = false;
            for framework in custom_frameworks_mut(stages.values_mut(), framework_id) {
                let list = framework.tasks.get_mut(stage);
                if index < list.len() {
                    list.remove(index);
                    removed = true;
                }
            }
            removed.then_some(())
        })
        .await
        .is_some()
    }

    /// Delete a custom framework, deselect it, and drop its good-practice
    /// tasks.
    pub async fn remove_custom_framework(&self, plan_id: PlanId, framework_id: &str) -> bool {
        self.mutate(plan_id, "remove_custom_framework", |stages| {
            let mut removed = false;
            for data in stages.values_mut() {
                let gp = &mut data.good_practice;
                let before = gp.custom_frameworks.len();
                gp.custom_frameworks.retain(|f| f.id != framework_id);
                removed |= gp.custom_frameworks.len() != before;
                gp.frameworks.retain(|c| c != framework_id);
                gp.tasks.retain(|t| t.framework_code != framework_id);
            }
            removed.then_some(())
        })
        .await
        .is_some()
    }
}

/// Every stage's copy of custom framework `id`.
fn custom_frameworks_mut<'a>(
    stages: impl Iterator<Item = &'a mut crate::model::StageData>,
    id: &'a str,
) -> impl Iterator<Item = &'a mut CustomFramework> {
    stages.flat_map(move |data| {
        data.good_practice
            .custom_frameworks
            .iter_mut()
            .filter(move |f| f.id == id)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::store::{MemoryAdapter, PlanStore};

    use super::*;

    async fn setup() -> (TaskLifecycle, PlanId) {
        let store = Arc::new(PlanStore::new(Arc::new(MemoryAdapter::new())));
        let plan_id = store.create(Some("Warehouse"), None).await.unwrap();
        (TaskLifecycle::new(store), plan_id)
    }

    #[tokio::test]
    async fn framework_toggle_selects_in_every_stage() {
        let (lifecycle, plan_id) = setup().await;
        assert!(lifecycle.toggle_framework(plan_id, "Scrum").await);

        let record = lifecycle.store().load(plan_id).await.unwrap();
        for (_, data) in record.stages.iter() {
            assert_eq!(data.good_practice.frameworks, vec!["Scrum".to_string()]);
        }

        assert!(lifecycle.toggle_framework(plan_id, "Scrum").await);
        let record = lifecycle.store().load(plan_id).await.unwrap();
        for (_, data) in record.stages.iter() {
            assert!(data.good_practice.frameworks.is_empty());
        }
    }

    #[tokio::test]
    async fn gp_task_toggle_is_keyed_by_text_code_and_stage() {
        let (lifecycle, plan_id) = setup().await;
        assert!(lifecycle.toggle_gp_task(plan_id, "Daily stand-up", "Scrum", Stage::Delivery).await);
        assert!(lifecycle.toggle_gp_task(plan_id, "Daily stand-up", "Lean", Stage::Delivery).await);
        assert!(lifecycle.toggle_gp_task(plan_id, "Daily stand-up", "Scrum", Stage::Closure).await);

        let record = lifecycle.store().load(plan_id).await.unwrap();
        assert_eq!(record.stage(Stage::Delivery).good_practice.tasks.len(), 2);
        assert_eq!(record.stage(Stage::Closure).good_practice.tasks.len(), 1);
    }

    #[tokio::test]
    async fn gp_task_status_updates_by_id() {
        let (lifecycle, plan_id) = setup().await;
        lifecycle.toggle_gp_task(plan_id, "Retrospective", "Scrum", Stage::Closure).await;
        let record = lifecycle.store().load(plan_id).await.unwrap();
        let id = record.stage(Stage::Closure).good_practice.tasks[0].id.clone();

        assert!(!lifecycle.update_gp_task_status(plan_id, &id, true, Stage::Delivery).await);
        assert!(lifecycle.update_gp_task_status(plan_id, &id, true, Stage::Closure).await);
        let record = lifecycle.store().load(plan_id).await.unwrap();
        assert!(record.stage(Stage::Closure).good_practice.tasks[0].completed);
    }

    #[tokio::test]
    async fn zone_can_be_cleared() {
        let (lifecycle, plan_id) = setup().await;
        assert!(lifecycle.set_zone(plan_id, Some(Zone::B)).await);
        assert!(lifecycle.set_zone(plan_id, None).await);
        let record = lifecycle.store().load(plan_id).await.unwrap();
        for (_, data) in record.stages.iter() {
            assert_eq!(data.good_practice.zone, None);
        }
    }

    #[tokio::test]
    async fn custom_framework_is_replicated_across_stages() {
        let (lifecycle, plan_id) = setup().await;
        let id = lifecycle.create_custom_framework(plan_id, "House style").await.unwrap();
        assert!(
            lifecycle
                .add_task_to_custom_framework(plan_id, &id, Stage::Definition, "Peer review")
                .await
        );

        let record = lifecycle.store().load(plan_id).await.unwrap();
        for (_, data) in record.stages.iter() {
            let framework = data.custom_framework(&id).unwrap();
            assert_eq!(framework.name, "House style");
            assert_eq!(framework.tasks.definition, vec!["Peer review".to_string()]);
        }
    }

    #[tokio::test]
    async fn custom_framework_task_removal_is_positional() {
        let (lifecycle, plan_id) = setup().await;
        let id = lifecycle.create_custom_framework(plan_id, "House style").await.unwrap();
        for text in ["First", "Second", "Third"] {
            lifecycle
                .add_task_to_custom_framework(plan_id, &id, Stage::Delivery, text)
                .await;
        }

        assert!(!lifecycle.remove_task_from_custom_framework(plan_id, &id, Stage::Delivery, 3).await);
        assert!(lifecycle.remove_task_from_custom_framework(plan_id, &id, Stage::Delivery, 1).await);
        assert!(!lifecycle.remove_task_from_custom_framework(plan_id, "nope", Stage::Delivery, 0).await);

        let record = lifecycle.store().load(plan_id).await.unwrap();
        let framework = record.stage(Stage::Delivery).custom_framework(&id).unwrap();
        assert_eq!(framework.tasks.delivery, vec!["First".to_string(), "Third".to_string()]);
    }

    #[tokio::test]
    async fn removing_custom_framework_cascades() {
        let (lifecycle, plan_id) = setup().await;
        let id = lifecycle.create_custom_framework(plan_id, "House style").await.unwrap();
        lifecycle.toggle_framework(plan_id, &id).await;
        lifecycle.toggle_gp_task(plan_id, "Peer review", &id, Stage::Delivery).await;

        assert!(lifecycle.remove_custom_framework(plan_id, &id).await);
        let record = lifecycle.store().load(plan_id).await.unwrap();
        for (_, data) in record.stages.iter() {
            assert!(data.good_practice.custom_frameworks.is_empty());
            assert!(data.good_practice.frameworks.is_empty());
            assert!(data.good_practice.tasks.is_empty());
        }
        assert!(!lifecycle.remove_custom_framework(plan_id, &id).await);
    }
}
