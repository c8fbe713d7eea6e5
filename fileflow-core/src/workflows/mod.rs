pub mod actions;
pub mod engine;
pub mod executor;
pub mod loader;
pub mod registry;
pub mod scheduler;
pub mod tracker;
pub mod trigger;
pub mod types;
pub mod validation;

pub use actions::{ActionContext, ActionHandler, ActionRegistry};
pub use engine::{EventCallback, WorkflowEngine, WorkflowStats};
pub use executor::{LoopOutcome, StepExecutor, UNKNOWN_ACTION_REASON};
pub use loader::{LoadedDraft, WorkflowLoader};
pub use registry::WorkflowRegistry;
pub use scheduler::{Admission, CronTable, ScheduleDecision};
pub use tracker::{
    ActionResult, ActionStatus, ExecutionCounts, ExecutionRecord, ExecutionStatus,
    ExecutionTracker, StepResult, StepStatus,
};
pub use trigger::{TriggerContext, TriggerKind, TriggerRegistration, TriggerSpec};
pub use types::{Action, ActionType, StepDefinition, WorkflowDefinition, WorkflowDraft};
pub use validation::validate_draft;
