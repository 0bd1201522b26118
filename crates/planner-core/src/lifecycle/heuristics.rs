//! Personal heuristics, success-factor ratings and seeding from reference
//! data.

use tracing::debug;

use crate::model::{
    FAVOURITE_LIMIT, PersonalHeuristic, PlanId, Stage, SuccessFactorRating, TaskItem,
    TaskOrigin, new_id,
};
use crate::presets::ReferenceData;

use super::TaskLifecycle;

impl TaskLifecycle {
    /// Add a personal heuristic to a stage and return its id.
    pub async fn add_heuristic(&self, plan_id: PlanId, stage: Stage, text: &str) -> Option<String> {
        self.mutate(plan_id, "add_heuristic", |stages| {
            let id = new_id();
            stages.get_mut(stage).personal_heuristics.push(PersonalHeuristic {
                id: id.clone(),
                text: text.to_owned(),
                ..PersonalHeuristic::default()
            });
            Some(id)
        })
        .await
    }

    pub async fn update_heuristic(
        &self,
        plan_id: PlanId,
        stage: Stage,
        heuristic_id: &str,
        text: Option<&str>,
        notes: Option<&str>,
    ) -> bool {
        self.mutate(plan_id, "update_heuristic", |stages| {
            let heuristic = stages
                .get_mut(stage)
                .personal_heuristics
                .iter_mut()
                .find(|h| h.id == heuristic_id)?;
            if let Some(text) = text {
                heuristic.text = text.to_owned();
            }
            if let Some(notes) = notes {
                heuristic.notes = notes.to_owned();
            }
            Some(())
        })
        .await
        .is_some()
    }

    /// Mark or unmark a heuristic as a favourite. Refuses to mark a fourth
    /// favourite in the same stage.
    pub async fn set_heuristic_favourite(
        &self,
        plan_id: PlanId,
        stage: Stage,
        heuristic_id: &str,
        favourite: bool,
    ) -> bool {
        self.mutate(plan_id, "set_heuristic_favourite", |stages| {
            let data = stages.get_mut(stage);
            let at_limit = data.favourite_heuristic_count() >= FAVOURITE_LIMIT;
            let heuristic = data
                .personal_heuristics
                .iter_mut()
                .find(|h| h.id == heuristic_id)?;
            if favourite && !heuristic.favourite && at_limit {
                debug!(stage = %stage, heuristic_id, "favourite limit reached");
                return None;
            }
            heuristic.favourite = favourite;
            Some(())
        })
        .await
        .is_some()
    }

    /// Remove a heuristic and its mapping from a stage. Tasks that came from
    /// the heuristic are kept.
    pub async fn remove_heuristic(&self, plan_id: PlanId, stage: Stage, heuristic_id: &str) -> bool {
        self.mutate(plan_id, "remove_heuristic", |stages| {
            let data = stages.get_mut(stage);
            let before = data.personal_heuristics.len();
            data.personal_heuristics.retain(|h| h.id != heuristic_id);
            if data.personal_heuristics.len() == before {
                return None;
            }
            data.mappings.retain(|m| m.heuristic_id != heuristic_id);
            Some(())
        })
        .await
        .is_some()
    }

    /// Rate a success factor for a stage. `rating` must be in `1..=5`.
    /// Existing notes are kept unless `notes` is given; the favourite flag
    /// is always kept.
    pub async fn rate_factor(
        &self,
        plan_id: PlanId,
        stage: Stage,
        factor_id: &str,
        rating: u8,
        notes: Option<&str>,
    ) -> bool {
        if !(1..=5).contains(&rating) {
            debug!(plan_id = %plan_id, factor_id, rating, "rating out of range");
            return false;
        }
        self.mutate(plan_id, "rate_factor", |stages| {
            let entry = stages
                .get_mut(stage)
                .success_factor_ratings
                .entry(factor_id.to_owned())
                .or_insert_with(|| SuccessFactorRating {
                    rating,
                    notes: String::new(),
                    favourite: false,
                    extra: Default::default(),
                });
            entry.rating = rating;
            if let Some(notes) = notes {
                entry.notes = notes.to_owned();
            }
            Some(())
        })
        .await
        .is_some()
    }

    /// Mark or unmark a rated factor as a favourite. The factor must already
    /// be rated in `stage`; at most three favourites per stage.
    pub async fn set_factor_favourite(
        &self,
        plan_id: PlanId,
        stage: Stage,
        factor_id: &str,
        favourite: bool,
    ) -> bool {
        self.mutate(plan_id, "set_factor_favourite", |stages| {
            let data = stages.get_mut(stage);
            let at_limit = data.favourite_factor_count() >= FAVOURITE_LIMIT;
            let rating = data.success_factor_ratings.get_mut(factor_id)?;
            if favourite && !rating.favourite && at_limit {
                debug!(stage = %stage, factor_id, "favourite limit reached");
                return None;
            }
            rating.favourite = favourite;
            Some(())
        })
        .await
        .is_some()
    }

    /// Copy the preset heuristics into every stage that has no personal
    /// heuristics yet. Returns how many stages were seeded.
    pub async fn seed_heuristics(&self, plan_id: PlanId, reference: &ReferenceData) -> Option<usize> {
        self.mutate(plan_id, "seed_heuristics", |stages| {
            let mut seeded = 0;
            for data in stages.values_mut() {
                if !data.personal_heuristics.is_empty() {
                    continue;
                }
                data.personal_heuristics = reference
                    .heuristics
                    .iter()
                    .map(|preset| PersonalHeuristic {
                        id: preset.id.clone(),
                        text: preset.text.clone(),
                        notes: preset.notes.clone(),
                        favourite: false,
                        extra: Default::default(),
                    })
                    .collect();
                seeded += 1;
            }
            Some(seeded)
        })
        .await
    }

    /// Append the reference tasks of `factor_id` for `stage` as factor-origin
    /// tasks, skipping texts the stage already holds for that factor.
    /// Returns the number of tasks added; 0 on any failure.
    pub async fn import_factor_tasks(
        &self,
        plan_id: PlanId,
        factor_id: &str,
        stage: Stage,
        reference: &ReferenceData,
    ) -> usize {
        if reference.factor(factor_id).is_none() {
            debug!(plan_id = %plan_id, factor_id, "unknown success factor");
            return 0;
        }
        let suggested = reference.factor_tasks(factor_id, stage);

        self.mutate(plan_id, "import_factor_tasks", |stages| {
            let tasks = &mut stages.get_mut(stage).tasks;
            let mut added = 0;
            for text in suggested {
                let present = tasks.iter().any(|t| {
                    t.origin == TaskOrigin::Factor
                        && t.source_id.as_deref() == Some(factor_id)
                        && t.text == *text
                });
                if present {
                    continue;
                }
                tasks.push(TaskItem {
                    id: new_id(),
                    text: text.clone(),
                    stage,
                    origin: TaskOrigin::Factor,
                    source_id: Some(factor_id.to_owned()),
                    completed: false,
                    notes: None,
                    priority: None,
                    due_date: None,
                    extra: Default::default(),
                });
                added += 1;
            }
            Some(added)
        })
        .await
        .unwrap_or(0)
    }
}
