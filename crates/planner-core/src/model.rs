//! Plan Record data model.
//!
//! The JSON shape produced here is the persisted format: camelCase field
//! names, stage keys spelled as the stage names (`"Identification"`, ...),
//! and unknown fields preserved on every persisted struct (the record, each
//! stage, and every entity inside a stage) so records written by newer
//! clients survive a load/save cycle.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::zone::Zone;

/// Identity of a plan.
pub type PlanId = Uuid;

/// Maximum number of favourite heuristics (or favourite success factors)
/// per stage.
pub const FAVOURITE_LIMIT: usize = 3;

/// Fresh identifier for a task, heuristic, or custom framework.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// One of the four fixed phases of the planning journey, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Identification,
    Definition,
    Delivery,
    Closure,
}

impl Stage {
    /// All stages in journey order.
    pub const ALL: [Stage; 4] = [
        Stage::Identification,
        Stage::Definition,
        Stage::Delivery,
        Stage::Closure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identification => "Identification",
            Self::Definition => "Definition",
            Self::Delivery => "Delivery",
            Self::Closure => "Closure",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = StageParseError;

    /// Case-insensitive: `identification`, `Identification` and
    /// `IDENTIFICATION` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StageParseError(s.to_owned()))
    }
}

/// Error returned when parsing an invalid [`Stage`] string.
#[derive(Debug, Clone)]
pub struct StageParseError(pub String);

impl fmt::Display for StageParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid stage: {:?} (expected identification, definition, delivery, or closure)",
            self.0
        )
    }
}

impl std::error::Error for StageParseError {}

// ---------------------------------------------------------------------------

/// Provenance of a [`TaskItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOrigin {
    Heuristic,
    Factor,
    Policy,
}

impl fmt::Display for TaskOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Heuristic => "heuristic",
            Self::Factor => "factor",
            Self::Policy => "policy",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskOrigin {
    type Err = TaskOriginParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heuristic" => Ok(Self::Heuristic),
            "factor" => Ok(Self::Factor),
            "policy" => Ok(Self::Policy),
            other => Err(TaskOriginParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskOrigin`] string.
#[derive(Debug, Clone)]
pub struct TaskOriginParseError(pub String);

impl fmt::Display for TaskOriginParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task origin: {:?}", self.0)
    }
}

impl std::error::Error for TaskOriginParseError {}

// ---------------------------------------------------------------------------

/// Optional priority attached to a [`TaskItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(PriorityParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Priority`] string.
#[derive(Debug, Clone)]
pub struct PriorityParseError(pub String);

impl fmt::Display for PriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid priority: {:?} (expected low, medium, or high)", self.0)
    }
}

impl std::error::Error for PriorityParseError {}

// ---------------------------------------------------------------------------
// Per-stage container
// ---------------------------------------------------------------------------

/// One value per [`Stage`]. Serialized as an object keyed by stage name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerStage<T> {
    #[serde(rename = "Identification", default)]
    pub identification: T,
    #[serde(rename = "Definition", default)]
    pub definition: T,
    #[serde(rename = "Delivery", default)]
    pub delivery: T,
    #[serde(rename = "Closure", default)]
    pub closure: T,
}

impl<T> PerStage<T> {
    pub fn get(&self, stage: Stage) -> &T {
        match stage {
            Stage::Identification => &self.identification,
            Stage::Definition => &self.definition,
            Stage::Delivery => &self.delivery,
            Stage::Closure => &self.closure,
        }
    }

    pub fn get_mut(&mut self, stage: Stage) -> &mut T {
        match stage {
            Stage::Identification => &mut self.identification,
            Stage::Definition => &mut self.definition,
            Stage::Delivery => &mut self.delivery,
            Stage::Closure => &mut self.closure,
        }
    }

    /// Iterate `(stage, value)` pairs in journey order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &T)> {
        [
            (Stage::Identification, &self.identification),
            (Stage::Definition, &self.definition),
            (Stage::Delivery, &self.delivery),
            (Stage::Closure, &self.closure),
        ]
        .into_iter()
    }

    /// Mutable values in journey order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        [
            &mut self.identification,
            &mut self.definition,
            &mut self.delivery,
            &mut self.closure,
        ]
        .into_iter()
    }
}

/// Stage data for all four stages of a plan.
pub type Stages = PerStage<StageData>;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalHeuristic {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub favourite: bool,
    /// Fields this version does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Links a personal heuristic to a success factor (or to none).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub heuristic_id: String,
    pub factor_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    /// Assigned at creation, never changed.
    pub id: String,
    /// Raw task text (never an encoded display name).
    pub text: String,
    pub stage: Stage,
    pub origin: TaskOrigin,
    /// Id of the originating heuristic or factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A task as supplied by a caller, before an id and stage are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub text: String,
    pub origin: TaskOrigin,
    pub source_id: Option<String>,
    pub completed: bool,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(text: impl Into<String>, origin: TaskOrigin) -> Self {
        Self {
            text: text.into(),
            origin,
            source_id: None,
            completed: false,
            notes: None,
            priority: None,
            due_date: None,
        }
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Field updates for an existing [`TaskItem`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub text: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTask {
    pub id: String,
    pub text: String,
    pub stage: Stage,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A user-authored framework. Its tasks are plain strings addressed by
/// stage and position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFramework {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tasks: PerStage<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A task pulled in from a selected framework. Unique per
/// `(text, framework_code, stage)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodPracticeTask {
    pub id: String,
    pub text: String,
    pub stage: Stage,
    pub framework_code: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessFactorRating {
    /// 1..=5.
    pub rating: u8,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub favourite: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Good-practice selection for one stage.
///
/// `zone`, `frameworks` and `custom_frameworks` are plan-wide values that
/// are stored identically in every stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodPractice {
    #[serde(default)]
    pub zone: Option<Zone>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<GoodPracticeTask>,
    #[serde(default)]
    pub custom_frameworks: Vec<CustomFramework>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageData {
    #[serde(default)]
    pub personal_heuristics: Vec<PersonalHeuristic>,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
    #[serde(default)]
    pub tasks: Vec<TaskItem>,
    #[serde(default)]
    pub policy_tasks: Vec<PolicyTask>,
    #[serde(default)]
    pub success_factor_ratings: BTreeMap<String, SuccessFactorRating>,
    #[serde(default)]
    pub good_practice: GoodPractice,
    /// Fields this version does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StageData {
    pub fn heuristic(&self, id: &str) -> Option<&PersonalHeuristic> {
        self.personal_heuristics.iter().find(|h| h.id == id)
    }

    pub fn favourite_heuristic_count(&self) -> usize {
        self.personal_heuristics.iter().filter(|h| h.favourite).count()
    }

    pub fn favourite_factor_count(&self) -> usize {
        self.success_factor_ratings
            .values()
            .filter(|r| r.favourite)
            .count()
    }

    pub fn custom_framework(&self, id: &str) -> Option<&CustomFramework> {
        self.good_practice.custom_frameworks.iter().find(|f| f.id == id)
    }
}

// ---------------------------------------------------------------------------
// Plan record
// ---------------------------------------------------------------------------

/// The root aggregate: all stage data for one planning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRecord {
    pub id: PlanId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub stages: Stages,
    /// Fields this version does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlanRecord {
    /// A record with empty data for every stage.
    pub fn new(id: PlanId, name: Option<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description,
            created: now,
            last_updated: now,
            stages: Stages::default(),
            extra: Map::new(),
        }
    }

    pub fn stage(&self, stage: Stage) -> &StageData {
        self.stages.get(stage)
    }

    /// The plan-wide zone. Read from the first stage; all stages hold the
    /// same value.
    pub fn zone(&self) -> Option<Zone> {
        self.stages.identification.good_practice.zone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_parses_case_insensitively() {
        assert_eq!("delivery".parse::<Stage>().unwrap(), Stage::Delivery);
        assert_eq!("CLOSURE".parse::<Stage>().unwrap(), Stage::Closure);
        assert!("launch".parse::<Stage>().is_err());
    }

    #[test]
    fn stage_display_matches_serde_name() {
        for stage in Stage::ALL {
            let json = serde_json::to_value(stage).unwrap();
            assert_eq!(json, json!(stage.to_string()));
        }
    }

    #[test]
    fn new_record_has_empty_good_practice_for_every_stage() {
        let record = PlanRecord::new(Uuid::new_v4(), None, None);
        for (_, data) in record.stages.iter() {
            assert_eq!(data.good_practice, GoodPractice::default());
            assert!(data.tasks.is_empty());
        }
    }

    #[test]
    fn record_serializes_with_stage_keys_and_camel_case() {
        let mut record = PlanRecord::new(Uuid::new_v4(), Some("Office move".into()), None);
        record.stages.definition.mappings.push(Mapping {
            heuristic_id: "h1".into(),
            factor_id: None,
            extra: Default::default(),
        });
        let value = serde_json::to_value(&record).unwrap();

        assert!(value.get("lastUpdated").is_some());
        assert!(value["stages"].get("Identification").is_some());
        let mapping = &value["stages"]["Definition"]["mappings"][0];
        assert_eq!(mapping["heuristicId"], json!("h1"));
        assert_eq!(mapping["factorId"], Value::Null);
        assert!(value["stages"]["Closure"]["goodPractice"]["customFrameworks"].is_array());
    }

    #[test]
    fn missing_stages_and_good_practice_default_to_empty() {
        let id = Uuid::new_v4();
        let value = json!({
            "id": id,
            "created": "2024-05-01T10:00:00Z",
            "lastUpdated": "2024-05-01T10:00:00Z",
            "stages": {"Identification": {"tasks": []}}
        });
        let record: PlanRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.stage(Stage::Closure), &StageData::default());
        assert!(record.stage(Stage::Identification).good_practice.frameworks.is_empty());
    }

    #[test]
    fn unknown_fields_round_trip() {
        let value = json!({
            "id": Uuid::new_v4(),
            "created": "2024-05-01T10:00:00Z",
            "lastUpdated": "2024-05-01T10:00:00Z",
            "owner": {"team": "estates"},
            "stages": {
                "Delivery": {"sponsorNotes": "call weekly", "tasks": []}
            }
        });
        let record: PlanRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.extra["owner"], json!({"team": "estates"}));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["owner"], json!({"team": "estates"}));
        assert_eq!(back["stages"]["Delivery"]["sponsorNotes"], json!("call weekly"));
    }

    #[test]
    fn unknown_fields_inside_stage_entities_round_trip() {
        let value = json!({
            "tasks": [{
                "id": "t1", "text": "Book the hall", "stage": "Delivery",
                "origin": "factor", "assignee": "kim"
            }],
            "goodPractice": {
                "legacyFlag": true,
                "tasks": [{
                    "id": "g1", "text": "Daily stand-up", "stage": "Delivery",
                    "frameworkCode": "Scrum", "completed": false, "owner": "ana"
                }]
            }
        });
        let data: StageData = serde_json::from_value(value).unwrap();
        assert_eq!(data.tasks[0].extra["assignee"], json!("kim"));
        assert_eq!(data.good_practice.extra["legacyFlag"], json!(true));
        assert_eq!(data.good_practice.tasks[0].extra["owner"], json!("ana"));

        let back = serde_json::to_value(&data).unwrap();
        assert_eq!(back["tasks"][0]["assignee"], json!("kim"));
        assert_eq!(back["goodPractice"]["legacyFlag"], json!(true));
        assert_eq!(back["goodPractice"]["tasks"][0]["owner"], json!("ana"));
    }

    #[test]
    fn task_item_omits_absent_optionals() {
        let task = TaskItem {
            id: "t1".into(),
            text: "Agree budget".into(),
            stage: Stage::Definition,
            origin: TaskOrigin::Factor,
            source_id: Some("F3".into()),
            completed: false,
            notes: None,
            priority: Some(Priority::High),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            extra: Default::default(),
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["sourceId"], json!("F3"));
        assert_eq!(value["origin"], json!("factor"));
        assert_eq!(value["priority"], json!("high"));
        assert_eq!(value["dueDate"], json!("2025-03-01"));
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn per_stage_iterates_in_journey_order() {
        let stages: Vec<Stage> = Stages::default().iter().map(|(s, _)| s).collect();
        assert_eq!(stages, Stage::ALL.to_vec());
    }
}
