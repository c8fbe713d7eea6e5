//! Execution records and the lifecycle state machine that owns them.
//!
//! Records live in memory for queries and every mutation is mirrored to the
//! configured [`ExecutionPersistence`]. Finished records beyond the retention
//! limit are dropped from memory once their final state is persisted; lookups
//! then fall back to persistence. Status moves
//! `Pending -> Running -> {Completed, Failed, Cancelled}` (or straight from
//! `Pending` to `Cancelled`); terminal states never change again.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::events::{Event, EventBus};
use crate::storage::ExecutionPersistence;
use crate::workflows::trigger::{TriggerContext, TriggerKind};
use crate::workflows::types::WorkflowDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Cancelled)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Skipped,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Completed,
    Failed,
    Skipped,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_type: String,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ActionResult {
    pub fn completed(action_type: impl Into<String>, output: Value) -> Self {
        Self {
            action_type: action_type.into(),
            status: ActionStatus::Completed,
            output: Some(output),
            error: None,
            reason: None,
        }
    }

    pub fn failed(action_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            status: ActionStatus::Failed,
            output: None,
            error: Some(error.into()),
            reason: None,
        }
    }

    pub fn skipped(action_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            status: ActionStatus::Skipped,
            output: None,
            error: None,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub name: String,
    pub status: StepStatus,
    /// One entry per action that ran, in declaration order.
    #[serde(default)]
    pub actions: Vec<ActionResult>,
    #[serde(default)]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub workflow_name: String,
    pub workflow_version: u32,
    pub status: ExecutionStatus,
    pub trigger: TriggerKind,
    #[serde(default)]
    pub event_type: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub runtime_ms: Option<i64>,
    #[serde(default)]
    pub step_results: Vec<StepResult>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub cancel_requested: bool,
}

impl ExecutionRecord {
    pub fn pending(id: Uuid, workflow: &WorkflowDefinition, trigger: &TriggerContext) -> Self {
        Self {
            id,
            workflow_id: workflow.id,
            workflow_name: workflow.name.clone(),
            workflow_version: workflow.version,
            status: ExecutionStatus::Pending,
            trigger: trigger.kind,
            event_type: trigger.event_type.clone(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            runtime_ms: None,
            step_results: Vec::new(),
            error: None,
            cancel_requested: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, next: ExecutionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "execution {} cannot move from {} to {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }

    fn finalize(&mut self, next: ExecutionStatus, error: Option<String>) -> Result<()> {
        self.transition(next)?;
        let completed_at = Utc::now();
        let started_at = self.started_at.unwrap_or(completed_at);
        self.completed_at = Some(completed_at);
        self.runtime_ms = Some((completed_at - started_at).num_milliseconds());
        self.error = error;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionCounts {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub average_runtime_ms: Option<f64>,
}

impl ExecutionCounts {
    fn add(&mut self, status: ExecutionStatus) {
        self.total += 1;
        match status {
            ExecutionStatus::Pending => self.pending += 1,
            ExecutionStatus::Running => self.running += 1,
            ExecutionStatus::Completed => self.completed += 1,
            ExecutionStatus::Failed => self.failed += 1,
            ExecutionStatus::Cancelled => self.cancelled += 1,
        }
    }
}

struct TrackedExecution {
    record: ExecutionRecord,
    cancel: CancellationToken,
}

/// Finished executions still in memory, oldest first, plus the totals of
/// those already evicted.
#[derive(Default)]
struct Retention {
    finished: VecDeque<Uuid>,
    evicted: ExecutionCounts,
    evicted_runtime_ms: i64,
    evicted_runtime_samples: usize,
}

pub const DEFAULT_RETAINED_EXECUTIONS: usize = 256;

pub struct ExecutionTracker {
    executions: RwLock<HashMap<Uuid, TrackedExecution>>,
    persistence: Arc<dyn ExecutionPersistence>,
    // Serializes persistence writes so snapshots land in mutation order.
    write_order: Mutex<()>,
    // Locked before `executions` whenever both are held.
    retention: Mutex<Retention>,
    retain_limit: usize,
    events: EventBus,
}

impl ExecutionTracker {
    pub fn new(persistence: Arc<dyn ExecutionPersistence>, events: EventBus) -> Self {
        Self {
            executions: RwLock::new(HashMap::new()),
            persistence,
            write_order: Mutex::new(()),
            retention: Mutex::new(Retention::default()),
            retain_limit: DEFAULT_RETAINED_EXECUTIONS,
            events,
        }
    }

    /// Number of finished executions kept in memory.
    pub fn with_retention(mut self, limit: usize) -> Self {
        self.retain_limit = limit;
        self
    }

    pub async fn create(
        &self,
        id: Uuid,
        workflow: &WorkflowDefinition,
        trigger: &TriggerContext,
    ) -> Result<ExecutionRecord> {
        let record = ExecutionRecord::pending(id, workflow, trigger);
        let _order = self.write_order.lock().await;
        {
            let mut executions = self.executions.write().await;
            if executions.contains_key(&id) {
                return Err(Error::InvalidState(format!("execution {id} already exists")));
            }
            executions.insert(
                id,
                TrackedExecution {
                    record: record.clone(),
                    cancel: CancellationToken::new(),
                },
            );
        }

        if let Err(err) = self.persistence.append(&record).await {
            self.executions.write().await.remove(&id);
            return Err(err);
        }

        self.events.publish(Event::ExecutionQueued {
            execution_id: id,
            workflow_id: workflow.id,
            trigger: trigger.kind,
        });
        tracing::debug!(execution_id = %id, workflow_id = %workflow.id, "execution created");
        Ok(record)
    }

    /// `Pending -> Running`. Fails with `InvalidState` when the execution was
    /// cancelled while waiting. A failed mirror write is logged; the next
    /// step write surfaces it.
    pub async fn start(&self, id: Uuid) -> Result<ExecutionRecord> {
        let record = self
            .mutate_entry(id, false, |entry| {
                entry.record.transition(ExecutionStatus::Running)?;
                entry.record.started_at = Some(Utc::now());
                Ok(true)
            })
            .await?;
        self.events.publish(Event::ExecutionStarted {
            execution_id: id,
            workflow_id: record.workflow_id,
        });
        Ok(record)
    }

    /// Appends a step result. Persistence failures propagate.
    pub async fn record_step(&self, id: Uuid, step: StepResult) -> Result<ExecutionRecord> {
        let step_id = step.step_id.clone();
        let status = step.status;
        let record = self
            .mutate(id, |record| {
                if record.status != ExecutionStatus::Running {
                    return Err(Error::InvalidState(format!(
                        "cannot record step '{}' on {} execution {}",
                        step.step_id,
                        record.status.as_str(),
                        record.id
                    )));
                }
                record.step_results.push(step);
                Ok(true)
            })
            .await?;
        self.events.publish(Event::StepFinished {
            execution_id: id,
            step_id,
            status,
        });
        Ok(record)
    }

    /// `Running -> Completed`, or `Cancelled` when a cancel was requested
    /// while the last step ran.
    pub async fn complete(&self, id: Uuid) -> Result<ExecutionRecord> {
        self.finish(id, ExecutionStatus::Completed, None).await
    }

    pub async fn fail(&self, id: Uuid, message: impl Into<String>) -> Result<ExecutionRecord> {
        self.finish(id, ExecutionStatus::Failed, Some(message.into()))
            .await
    }

    pub async fn mark_cancelled(&self, id: Uuid) -> Result<ExecutionRecord> {
        self.finish(id, ExecutionStatus::Cancelled, None).await
    }

    /// Cancels a pending execution outright, flags a running one for the
    /// executor to stop between steps, and leaves terminal ones untouched.
    pub async fn request_cancel(&self, id: Uuid) -> Result<ExecutionRecord> {
        let mut cancelled_while_pending = false;
        let result = self
            .apply_entry(id, false, |entry| match entry.record.status {
                ExecutionStatus::Pending => {
                    entry.record.cancel_requested = true;
                    entry.record.finalize(ExecutionStatus::Cancelled, None)?;
                    entry.cancel.cancel();
                    cancelled_while_pending = true;
                    Ok(true)
                }
                ExecutionStatus::Running if !entry.record.cancel_requested => {
                    entry.record.cancel_requested = true;
                    entry.cancel.cancel();
                    Ok(true)
                }
                _ => Ok(false),
            })
            .await;

        let (record, persisted) = match result {
            Ok(applied) => applied,
            Err(Error::NotFound(_)) => return self.get(id).await,
            Err(err) => return Err(err),
        };

        if cancelled_while_pending {
            self.publish_finished(&record);
            if persisted {
                self.retire(id).await;
            }
        }
        tracing::info!(execution_id = %id, status = record.status.as_str(), "cancellation requested");
        Ok(record)
    }

    pub async fn cancellation_token(&self, id: Uuid) -> Result<CancellationToken> {
        self.executions
            .read()
            .await
            .get(&id)
            .map(|entry| entry.cancel.clone())
            .ok_or_else(|| Error::NotFound(format!("execution {id}")))
    }

    /// In-memory record, falling back to persisted history.
    pub async fn get(&self, id: Uuid) -> Result<ExecutionRecord> {
        if let Some(entry) = self.executions.read().await.get(&id) {
            return Ok(entry.record.clone());
        }
        self.persistence
            .load(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("execution {id}")))
    }

    pub async fn list(&self, workflow_id: Option<Uuid>) -> Vec<ExecutionRecord> {
        let mut records: Vec<ExecutionRecord> = self
            .executions
            .read()
            .await
            .values()
            .map(|entry| &entry.record)
            .filter(|record| workflow_id.map_or(true, |id| record.workflow_id == id))
            .cloned()
            .collect();
        records.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        records
    }

    /// Counts every execution of this process, evicted ones included.
    pub async fn counts(&self) -> ExecutionCounts {
        let retention = self.retention.lock().await;
        let executions = self.executions.read().await;
        let mut counts = retention.evicted.clone();
        let mut runtime_total = retention.evicted_runtime_ms;
        let mut runtime_samples = retention.evicted_runtime_samples;

        for entry in executions.values() {
            let record = &entry.record;
            counts.add(record.status);
            if let (Some(runtime), Some(_)) = (record.runtime_ms, record.started_at) {
                runtime_total += runtime;
                runtime_samples += 1;
            }
        }

        if runtime_samples > 0 {
            counts.average_runtime_ms = Some(runtime_total as f64 / runtime_samples as f64);
        }
        counts
    }

    async fn finish(
        &self,
        id: Uuid,
        status: ExecutionStatus,
        error: Option<String>,
    ) -> Result<ExecutionRecord> {
        let (record, persisted) = self
            .apply_entry(id, false, |entry| {
                let status = if status == ExecutionStatus::Completed && entry.record.cancel_requested {
                    ExecutionStatus::Cancelled
                } else {
                    status
                };
                entry.record.finalize(status, error)?;
                Ok(true)
            })
            .await?;

        self.publish_finished(&record);
        tracing::info!(
            execution_id = %id,
            workflow_id = %record.workflow_id,
            status = record.status.as_str(),
            runtime_ms = record.runtime_ms.unwrap_or_default(),
            "execution finished"
        );
        if persisted {
            self.retire(id).await;
        }
        Ok(record)
    }

    /// Queues a finished execution for eviction and evicts the oldest ones
    /// beyond the retention limit. Only called once the final state is
    /// persisted.
    async fn retire(&self, id: Uuid) {
        let mut retention = self.retention.lock().await;
        retention.finished.push_back(id);
        if retention.finished.len() <= self.retain_limit {
            return;
        }

        let mut executions = self.executions.write().await;
        while retention.finished.len() > self.retain_limit {
            let Some(oldest) = retention.finished.pop_front() else {
                break;
            };
            let Some(entry) = executions.remove(&oldest) else {
                continue;
            };
            let record = entry.record;
            retention.evicted.add(record.status);
            if let (Some(runtime), Some(_)) = (record.runtime_ms, record.started_at) {
                retention.evicted_runtime_ms += runtime;
                retention.evicted_runtime_samples += 1;
            }
            tracing::trace!(execution_id = %oldest, "finished execution evicted from memory");
        }
    }

    fn publish_finished(&self, record: &ExecutionRecord) {
        self.events.publish(Event::ExecutionFinished {
            execution_id: record.id,
            workflow_id: record.workflow_id,
            status: record.status,
        });
    }

    async fn mutate<F>(&self, id: Uuid, apply: F) -> Result<ExecutionRecord>
    where
        F: FnOnce(&mut ExecutionRecord) -> Result<bool>,
    {
        self.mutate_entry(id, true, |entry| apply(&mut entry.record))
            .await
    }

    async fn mutate_entry<F>(&self, id: Uuid, strict: bool, apply: F) -> Result<ExecutionRecord>
    where
        F: FnOnce(&mut TrackedExecution) -> Result<bool>,
    {
        self.apply_entry(id, strict, apply)
            .await
            .map(|(record, _)| record)
    }

    /// Applies `apply` under the write lock and mirrors the new snapshot when
    /// it reports a change. A rejected change leaves the record as it was.
    /// With `strict` unset, a failed mirror write is logged and the in-memory
    /// state still stands. The flag is `false` when persistence is behind.
    async fn apply_entry<F>(
        &self,
        id: Uuid,
        strict: bool,
        apply: F,
    ) -> Result<(ExecutionRecord, bool)>
    where
        F: FnOnce(&mut TrackedExecution) -> Result<bool>,
    {
        let _order = self.write_order.lock().await;
        let (snapshot, changed) = {
            let mut executions = self.executions.write().await;
            let entry = executions
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("execution {id}")))?;
            let before = entry.record.clone();
            match apply(entry) {
                Ok(changed) => (entry.record.clone(), changed),
                Err(err) => {
                    entry.record = before;
                    return Err(err);
                }
            }
        };

        if changed {
            if let Err(err) = self.persistence.update(&snapshot).await {
                if strict {
                    return Err(err);
                }
                tracing::error!(execution_id = %id, error = %err, "failed to persist execution state");
                return Ok((snapshot, false));
            }
        }
        Ok((snapshot, true))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use super::{ExecutionStatus, ExecutionTracker, StepResult, StepStatus};
    use crate::error::Error;
    use crate::events::EventBus;
    use crate::storage::memory::MemoryExecutionStore;
    use crate::storage::ExecutionPersistence;
    use crate::workflows::trigger::TriggerContext;
    use crate::workflows::types::{WorkflowDefinition, WorkflowDraft};

    fn tracker() -> (ExecutionTracker, Arc<MemoryExecutionStore>) {
        let store = Arc::new(MemoryExecutionStore::new());
        (
            ExecutionTracker::new(store.clone(), EventBus::default()),
            store,
        )
    }

    fn workflow() -> WorkflowDefinition {
        WorkflowDefinition::from_draft(Uuid::new_v4(), 1, WorkflowDraft::new("tidy"))
    }

    fn step(id: &str) -> StepResult {
        StepResult {
            step_id: id.to_owned(),
            name: id.to_owned(),
            status: StepStatus::Completed,
            actions: Vec::new(),
            error: None,
            started_at: Utc::now(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn transition_graph() {
        use ExecutionStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));
        for terminal in [Completed, Failed, Cancelled] {
            for next in [Pending, Running, Completed, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[tokio::test]
    async fn runs_through_lifecycle_and_mirrors_every_change() {
        let (tracker, store) = tracker();
        let id = Uuid::new_v4();
        tracker
            .create(id, &workflow(), &TriggerContext::manual())
            .await
            .expect("create");
        tracker.start(id).await.expect("start");
        tracker.record_step(id, step("one")).await.expect("step");

        let persisted = store.load(id).await.expect("load").expect("persisted");
        assert_eq!(persisted.status, ExecutionStatus::Running);
        assert_eq!(persisted.step_results.len(), 1);

        let done = tracker.complete(id).await.expect("complete");
        assert_eq!(done.status, ExecutionStatus::Completed);
        assert!(done.completed_at.is_some());
        assert!(done.runtime_ms.is_some_and(|runtime| runtime >= 0));

        let err = tracker.fail(id, "late").await.expect_err("terminal");
        assert!(matches!(err, Error::InvalidState(_)));
        let unchanged = tracker.get(id).await.expect("get");
        assert_eq!(unchanged.status, ExecutionStatus::Completed);
        assert_eq!(unchanged.error, None);
    }

    #[tokio::test]
    async fn cancelling_pending_is_immediate_and_blocks_start() {
        let (tracker, _) = tracker();
        let id = Uuid::new_v4();
        tracker
            .create(id, &workflow(), &TriggerContext::manual())
            .await
            .expect("create");

        let cancelled = tracker.request_cancel(id).await.expect("cancel");
        assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
        assert!(cancelled.completed_at.is_some());
        assert!(tracker.start(id).await.is_err());
    }

    #[tokio::test]
    async fn cancelling_running_only_sets_the_flag() {
        let (tracker, _) = tracker();
        let id = Uuid::new_v4();
        tracker
            .create(id, &workflow(), &TriggerContext::manual())
            .await
            .expect("create");
        tracker.start(id).await.expect("start");
        let token = tracker.cancellation_token(id).await.expect("token");

        let record = tracker.request_cancel(id).await.expect("cancel");
        assert_eq!(record.status, ExecutionStatus::Running);
        assert!(record.cancel_requested);
        assert!(token.is_cancelled());

        let finished = tracker.mark_cancelled(id).await.expect("finalize");
        assert_eq!(finished.status, ExecutionStatus::Cancelled);
        let again = tracker.request_cancel(id).await.expect("terminal cancel");
        assert_eq!(again, finished);
    }

    #[tokio::test]
    async fn completing_after_cancel_request_ends_cancelled() {
        let (tracker, store) = tracker();
        let id = Uuid::new_v4();
        tracker
            .create(id, &workflow(), &TriggerContext::manual())
            .await
            .expect("create");
        tracker.start(id).await.expect("start");
        tracker.request_cancel(id).await.expect("cancel");
        tracker.record_step(id, step("last")).await.expect("step");

        let finished = tracker.complete(id).await.expect("finish");
        assert_eq!(finished.status, ExecutionStatus::Cancelled);
        assert_eq!(finished.step_results.len(), 1);
        let persisted = store.load(id).await.expect("load").expect("persisted");
        assert_eq!(persisted.status, ExecutionStatus::Cancelled);
    }

    #[tokio::test]
    async fn finished_executions_beyond_retention_are_served_from_persistence() {
        let store = Arc::new(MemoryExecutionStore::new());
        let tracker = ExecutionTracker::new(store.clone(), EventBus::default()).with_retention(1);
        let workflow = workflow();

        let mut ids = Vec::new();
        for _ in 0..3 {
            let id = Uuid::new_v4();
            tracker
                .create(id, &workflow, &TriggerContext::manual())
                .await
                .expect("create");
            tracker.start(id).await.expect("start");
            tracker.record_step(id, step("only")).await.expect("step");
            tracker.complete(id).await.expect("complete");
            ids.push(id);
        }
        let pending = Uuid::new_v4();
        tracker
            .create(pending, &workflow, &TriggerContext::manual())
            .await
            .expect("create pending");

        let in_memory: Vec<Uuid> = tracker.list(None).await.iter().map(|record| record.id).collect();
        assert_eq!(in_memory.len(), 2);
        assert!(in_memory.contains(&ids[2]));
        assert!(in_memory.contains(&pending));

        let evicted = tracker.get(ids[0]).await.expect("served from persistence");
        assert_eq!(evicted.status, ExecutionStatus::Completed);
        assert_eq!(evicted.step_results.len(), 1);
        let again = tracker.request_cancel(ids[0]).await.expect("cancel evicted");
        assert_eq!(again.status, ExecutionStatus::Completed);

        let counts = tracker.counts().await;
        assert_eq!(counts.total, 4);
        assert_eq!(counts.completed, 3);
        assert_eq!(counts.pending, 1);
        assert!(counts.average_runtime_ms.is_some());
    }

    #[tokio::test]
    async fn unknown_execution_is_not_found() {
        let (tracker, _) = tracker();
        assert!(matches!(
            tracker.get(Uuid::new_v4()).await,
            Err(Error::NotFound(_))
        ));
    }
}
