use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::workflows::trigger::TriggerKind;
use crate::workflows::tracker::{ExecutionStatus, StepStatus};

/// Engine lifecycle notifications published on the [`EventBus`](super::EventBus).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ExecutionQueued {
        execution_id: Uuid,
        workflow_id: Uuid,
        trigger: TriggerKind,
    },
    ExecutionStarted {
        execution_id: Uuid,
        workflow_id: Uuid,
    },
    StepFinished {
        execution_id: Uuid,
        step_id: String,
        status: StepStatus,
    },
    ExecutionFinished {
        execution_id: Uuid,
        workflow_id: Uuid,
        status: ExecutionStatus,
    },
    FiringDropped {
        workflow_id: Uuid,
        trigger: TriggerKind,
        nominal_time: Option<DateTime<Utc>>,
        reason: String,
    },
}
