use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: String,
    pub message: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub workflow_id: Uuid,
    pub execution_id: Uuid,
}

/// Fire-and-forget delivery. Implementations must not block the caller.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub name: String,
    pub workflow_id: Uuid,
    pub execution_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub body: Value,
}

#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Stores the report and returns its id.
    async fn persist(&self, report: Report) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptInvocation {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl ScriptInvocation {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
            timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Runs to completion or fails with `Error::Timeout`. A non-zero exit is
    /// reported in the output, not as an error.
    async fn run(&self, invocation: ScriptInvocation) -> Result<ScriptOutput>;
}
