//! Workflow automation for file records: condition-gated multi-step
//! pipelines fired manually, on a cron schedule or by named events, plus a
//! rule-based sorting and classification engine.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod rules;
pub mod runtime;
pub mod sorting;
pub mod storage;
pub mod tools;
pub mod workflows;

pub use config::Config;
pub use error::{Error, Result};
pub use events::{Event, EventBus};
pub use rules::{Condition, ConditionOperator, RuleEvaluator, SortingRule};
pub use runtime::Collaborators;
pub use sorting::{SortCriterion, SortDirection, SortingEngine};
pub use storage::model::FileRecord;
pub use workflows::{
    ExecutionRecord, ExecutionStatus, TriggerContext, WorkflowDefinition, WorkflowDraft,
    WorkflowEngine,
};

/// Builds an engine from a config file (or defaults plus `FILEFLOW_*`
/// environment overrides when `path` is `None`).
pub fn engine_from_config_path(path: Option<&std::path::Path>) -> Result<WorkflowEngine> {
    let config = config::load(path)?;
    WorkflowEngine::from_config(config)
}
