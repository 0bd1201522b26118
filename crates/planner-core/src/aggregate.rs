//! Parent aggregator: the read-only checklist view of a plan.
//!
//! A stage's tasks come from several places in the record: stage tasks
//! (heuristic, factor and policy origin), policy tasks, good-practice tasks
//! and the string lists of custom frameworks. [`group_stage`] collects all
//! of them into [`ParentGroup`]s keyed by the parent they came from, in the
//! order each parent is first encountered.
//!
//! Stored text is raw, but older records may hold encoded names, so text is
//! decoded once more here. Display names are encoded from the raw text with
//! the task's position inside its group as sequence number.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::model::{PlanId, PlanRecord, Stage, TaskOrigin};
use crate::naming::{self, TaskFamily};
use crate::presets::{FrameworkDef, framework_catalog};
use crate::store::{PlanStore, StoreError};

const HEURISTIC_PARENT: &str = "personal-heuristic";
const HEURISTIC_LABEL: &str = "Personal Heuristic";
const FACTOR_PARENT: &str = "success-factors";
const FACTOR_LABEL: &str = "Success Factor Tasks";
const POLICY_PARENT: &str = "organizational-policy";
const POLICY_LABEL: &str = "Organizational Policy";

/// Where a group of tasks came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentSource {
    Heuristic,
    Factor,
    Policy,
    Framework,
}

impl fmt::Display for ParentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Heuristic => "heuristic",
            Self::Factor => "factor",
            Self::Policy => "policy",
            Self::Framework => "framework",
        };
        f.write_str(s)
    }
}

/// One task in the checklist view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedTask {
    /// `None` for custom framework entries, which have no id.
    pub id: Option<String>,
    pub text: String,
    pub display_name: String,
    pub completed: bool,
    pub origin: ParentSource,
}

/// Tasks sharing an originating parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentGroup {
    pub parent_id: String,
    pub label: String,
    pub source: ParentSource,
    pub tasks: Vec<GroupedTask>,
}

impl ParentGroup {
    fn family(&self) -> TaskFamily {
        match self.source {
            ParentSource::Heuristic => TaskFamily::Heuristic,
            ParentSource::Factor => TaskFamily::Factor,
            ParentSource::Policy => TaskFamily::Policy,
            ParentSource::Framework => TaskFamily::framework(&self.label),
        }
    }
}

/// Task counts for one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub total: usize,
    pub completed: usize,
}

impl StageSummary {
    pub fn from_groups(groups: &[ParentGroup]) -> Self {
        groups
            .iter()
            .flat_map(|g| &g.tasks)
            .fold(Self::default(), |mut summary, task| {
                summary.total += 1;
                summary.completed += usize::from(task.completed);
                summary
            })
    }
}

/// The grouped view of one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageChecklist {
    pub stage: Stage,
    pub summary: StageSummary,
    pub groups: Vec<ParentGroup>,
}

/// A plan together with its checklist, as handed to exporters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanExport {
    pub plan: PlanRecord,
    pub checklist: Vec<StageChecklist>,
}

/// Accumulates groups in first-encounter order.
struct Grouper {
    groups: Vec<ParentGroup>,
    index: HashMap<(ParentSource, String), usize>,
}

impl Grouper {
    fn new() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn push(
        &mut self,
        source: ParentSource,
        parent_id: &str,
        label: &str,
        id: Option<&str>,
        text: &str,
        completed: bool,
    ) {
        let key = (source, parent_id.to_owned());
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.groups.push(ParentGroup {
                    parent_id: parent_id.to_owned(),
                    label: label.to_owned(),
                    source,
                    tasks: Vec::new(),
                });
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[slot].tasks.push(GroupedTask {
            id: id.map(str::to_owned),
            text: naming::decode(text).to_owned(),
            display_name: String::new(),
            completed,
            origin: source,
        });
    }

    fn finish(mut self, stage: Stage) -> Vec<ParentGroup> {
        for group in &mut self.groups {
            let family = group.family();
            for (seq, task) in group.tasks.iter_mut().enumerate() {
                task.display_name = naming::encode(&family, stage, seq, &task.text);
            }
        }
        self.groups
    }
}

/// Group a stage's tasks by originating parent.
pub fn group_stage(record: &PlanRecord, stage: Stage) -> Vec<ParentGroup> {
    group_stage_with(record, stage, framework_catalog())
}

fn group_stage_with(record: &PlanRecord, stage: Stage, catalog: &[FrameworkDef]) -> Vec<ParentGroup> {
    let data = record.stage(stage);
    let mut grouper = Grouper::new();

    for task in &data.tasks {
        match task.origin {
            TaskOrigin::Heuristic => {
                let (parent_id, label) = match task.source_id.as_deref() {
                    Some(id) => (
                        id,
                        data.heuristic(id).map_or(HEURISTIC_LABEL, |h| h.text.as_str()),
                    ),
                    None => (HEURISTIC_PARENT, HEURISTIC_LABEL),
                };
                grouper.push(
                    ParentSource::Heuristic,
                    parent_id,
                    label,
                    Some(&task.id),
                    &task.text,
                    task.completed,
                );
            }
            TaskOrigin::Factor => grouper.push(
                ParentSource::Factor,
                FACTOR_PARENT,
                FACTOR_LABEL,
                Some(&task.id),
                &task.text,
                task.completed,
            ),
            TaskOrigin::Policy => grouper.push(
                ParentSource::Policy,
                POLICY_PARENT,
                POLICY_LABEL,
                Some(&task.id),
                &task.text,
                task.completed,
            ),
        }
    }

    for task in &data.policy_tasks {
        grouper.push(
            ParentSource::Policy,
            POLICY_PARENT,
            POLICY_LABEL,
            Some(&task.id),
            &task.text,
            false,
        );
    }

    for task in &data.good_practice.tasks {
        let code = task.framework_code.as_str();
        let label = catalog
            .iter()
            .find(|f| f.code == code)
            .map(|f| f.name.as_str())
            .or_else(|| data.custom_framework(code).map(|f| f.name.as_str()))
            .unwrap_or(code);
        grouper.push(
            ParentSource::Framework,
            code,
            label,
            Some(&task.id),
            &task.text,
            task.completed,
        );
    }

    for framework in &data.good_practice.custom_frameworks {
        for text in framework.tasks.get(stage) {
            grouper.push(
                ParentSource::Framework,
                &framework.id,
                &framework.name,
                None,
                text,
                false,
            );
        }
    }

    grouper.finish(stage)
}

/// Builds checklist views of plans held by a [`PlanStore`].
#[derive(Debug, Clone)]
pub struct ParentAggregator {
    store: Arc<PlanStore>,
}

impl ParentAggregator {
    pub fn new(store: Arc<PlanStore>) -> Self {
        Self { store }
    }

    pub async fn parents_by_stage(
        &self,
        plan_id: PlanId,
        stage: Stage,
    ) -> Result<Vec<ParentGroup>, StoreError> {
        let record = self.store.load(plan_id).await?;
        Ok(group_stage(&record, stage))
    }

    pub async fn stage_summary(
        &self,
        plan_id: PlanId,
        stage: Stage,
    ) -> Result<StageSummary, StoreError> {
        let groups = self.parents_by_stage(plan_id, stage).await?;
        Ok(StageSummary::from_groups(&groups))
    }

    /// The grouped view of every stage, in journey order.
    pub async fn checklist(&self, plan_id: PlanId) -> Result<Vec<StageChecklist>, StoreError> {
        let record = self.store.load(plan_id).await?;
        Ok(checklist_for(&record))
    }

    pub async fn export(&self, plan_id: PlanId) -> Result<PlanExport, StoreError> {
        let plan = self.store.load(plan_id).await?;
        let checklist = checklist_for(&plan);
        Ok(PlanExport { plan, checklist })
    }
}

fn checklist_for(record: &PlanRecord) -> Vec<StageChecklist> {
    let catalog = framework_catalog();
    Stage::ALL
        .into_iter()
        .map(|stage| {
            let groups = group_stage_with(record, stage, catalog);
            StageChecklist {
                stage,
                summary: StageSummary::from_groups(&groups),
                groups,
            }
        })
        .collect()
}
