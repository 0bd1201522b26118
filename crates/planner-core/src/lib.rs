//! Plan Record Engine: the staged planning data model, task lifecycle
//! operations, task-naming codec, zone recommendation, and the
//! parent-grouped checklist view.

pub mod aggregate;
pub mod lifecycle;
pub mod model;
pub mod naming;
pub mod presets;
pub mod store;
pub mod zone;

pub use aggregate::{
    GroupedTask, ParentAggregator, ParentGroup, ParentSource, PlanExport, StageChecklist,
    StageSummary,
};
pub use lifecycle::TaskLifecycle;
pub use model::{NewTask, PlanId, PlanRecord, Stage, StageData, TaskOrigin};
pub use store::{PersistenceAdapter, PlanPatch, PlanStore, StoreConfig, StoreError};
pub use zone::{Scope, Uncertainty, Zone};
