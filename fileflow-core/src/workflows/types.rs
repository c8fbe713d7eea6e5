use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::rules::condition::Condition;
use crate::workflows::trigger::TriggerSpec;

/// Operator-supplied workflow content, accepted by create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDraft {
    /// Stable id to reuse across restarts; generated when absent.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub trigger: TriggerSpec,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl WorkflowDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            trigger: TriggerSpec::Manual,
            steps: Vec::new(),
            is_active: true,
        }
    }

    pub fn with_trigger(mut self, trigger: TriggerSpec) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }
}

/// One immutable version of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: Uuid,
    pub version: u32,
    pub name: String,
    pub description: String,
    pub trigger: TriggerSpec,
    pub steps: Vec<StepDefinition>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    pub fn from_draft(id: Uuid, version: u32, draft: WorkflowDraft) -> Self {
        Self {
            id,
            version,
            name: draft.name,
            description: draft.description,
            trigger: draft.trigger,
            steps: draft.steps,
            is_active: draft.is_active,
            created_at: Utc::now(),
        }
    }

    /// Draft with the same content, used to derive the next version.
    pub fn to_draft(&self) -> WorkflowDraft {
        WorkflowDraft {
            id: Some(self.id),
            name: self.name.clone(),
            description: self.description.clone(),
            trigger: self.trigger.clone(),
            steps: self.steps.clone(),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Free-form label; not interpreted by the executor.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl StepDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: String::new(),
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn then(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default = "empty_params")]
    pub params: Value,
}

fn empty_params() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Action {
    pub fn new(action_type: ActionType, params: Value) -> Self {
        let params = if params.is_null() {
            empty_params()
        } else {
            params
        };
        Self {
            action_type,
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    SortFiles,
    MoveFiles,
    ProcessFiles,
    SendNotification,
    CreateReport,
    RunScript,
    Custom(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SortFiles => "sort_files",
            Self::MoveFiles => "move_files",
            Self::ProcessFiles => "process_files",
            Self::SendNotification => "send_notification",
            Self::CreateReport => "create_report",
            Self::RunScript => "run_script",
            Self::Custom(name) => name,
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl From<String> for ActionType {
    fn from(raw: String) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|ch| *ch != '_' && *ch != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "sortfiles" => Self::SortFiles,
            "movefiles" => Self::MoveFiles,
            "processfiles" => Self::ProcessFiles,
            "sendnotification" => Self::SendNotification,
            "createreport" => Self::CreateReport,
            "runscript" => Self::RunScript,
            _ => Self::Custom(raw),
        }
    }
}

impl From<&str> for ActionType {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_owned())
    }
}

impl From<ActionType> for String {
    fn from(action_type: ActionType) -> Self {
        action_type.as_str().to_owned()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
