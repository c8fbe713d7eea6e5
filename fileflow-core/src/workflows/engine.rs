use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock as StdRwLock};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{validate_config, Config};
use crate::error::{Error, Result};
use crate::events::{Event, EventBus};
use crate::rules::evaluator::RuleEvaluator;
use crate::runtime::Collaborators;
use crate::sorting::engine::SortingEngine;
use crate::storage::model::{AttributeMap, FileRecord};
use crate::workflows::actions::{ActionContext, ActionHandler, ActionRegistry};
use crate::workflows::executor::{panic_message, LoopOutcome, StepExecutor};
use crate::workflows::registry::WorkflowRegistry;
use crate::workflows::scheduler::{Admission, CronTable, ExecutionPermit, ScheduleDecision};
use crate::workflows::tracker::{ExecutionCounts, ExecutionRecord, ExecutionTracker};
use crate::workflows::trigger::{TriggerContext, TriggerKind, TriggerRegistration, TriggerSpec};
use crate::workflows::types::{ActionType, WorkflowDefinition, WorkflowDraft};
use crate::workflows::validation::validate_draft;

/// In-process callback run by [`WorkflowEngine::trigger_event`].
pub type EventCallback = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowStats {
    pub total_workflows: usize,
    pub active_workflows: usize,
    pub executions: ExecutionCounts,
    /// Completed share of finished executions.
    pub success_rate: Option<f64>,
    pub average_runtime_ms: Option<f64>,
}

struct EngineInner {
    config: Config,
    registry: RwLock<WorkflowRegistry>,
    tracker: ExecutionTracker,
    executor: StepExecutor,
    actions: Arc<ActionRegistry>,
    sorting: SortingEngine,
    evaluator: RuleEvaluator,
    cron: Mutex<CronTable>,
    admission: Admission,
    handlers: StdRwLock<HashMap<String, Vec<EventCallback>>>,
    collaborators: Collaborators,
    events: EventBus,
    ticker: Mutex<Option<CancellationToken>>,
}

/// Entry point of the automation engine: owns workflow definitions, admits
/// and runs executions, drives the cron table and dispatches events.
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct WorkflowEngine {
    inner: Arc<EngineInner>,
}

impl WorkflowEngine {
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self> {
        validate_config(&config)?;

        let events = EventBus::new(config.execution.event_bus_capacity);
        let actions = Arc::new(ActionRegistry::with_builtin_handlers());
        let executor = StepExecutor::new(
            actions.clone(),
            Duration::from_secs(config.execution.default_action_timeout_seconds),
        );
        let tracker = ExecutionTracker::new(collaborators.executions.clone(), events.clone())
            .with_retention(config.execution.retained_executions);
        let cron = CronTable::new(Duration::from_secs(config.scheduler.misfire_grace_seconds));
        let admission = Admission::new(&config.scheduler);

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                registry: RwLock::new(WorkflowRegistry::new()),
                tracker,
                executor,
                actions,
                sorting: SortingEngine::new(),
                evaluator: RuleEvaluator::new(),
                cron: Mutex::new(cron),
                admission,
                handlers: StdRwLock::new(HashMap::new()),
                collaborators,
                events,
                ticker: Mutex::new(None),
            }),
        })
    }

    /// Engine with the collaborators the config describes.
    pub fn from_config(config: Config) -> Result<Self> {
        let collaborators = Collaborators::from_config(&config)?;
        Self::new(config, collaborators)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.inner.collaborators
    }

    pub fn sorting(&self) -> SortingEngine {
        self.inner.sorting
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    pub async fn create_workflow(&self, draft: WorkflowDraft) -> Result<Uuid> {
        validate_draft(&draft, &self.inner.actions)?;
        let definition = self.inner.registry.write().await.register(draft)?;
        self.sync_schedule(&definition)?;
        tracing::info!(
            workflow_id = %definition.id,
            name = %definition.name,
            trigger = definition.trigger.kind().as_str(),
            steps = definition.steps.len(),
            "workflow created"
        );
        Ok(definition.id)
    }

    /// Stores `draft` as the next version; running executions keep theirs.
    pub async fn update_workflow(&self, id: Uuid, draft: WorkflowDraft) -> Result<u32> {
        validate_draft(&draft, &self.inner.actions)?;
        let definition = self.inner.registry.write().await.update(id, draft)?;
        self.sync_schedule(&definition)?;
        if !definition.is_active {
            self.inner.admission.forget_idle(id);
        }
        tracing::info!(workflow_id = %id, version = definition.version, "workflow updated");
        Ok(definition.version)
    }

    pub async fn set_workflow_active(&self, id: Uuid, active: bool) -> Result<u32> {
        let current = self.get_workflow(id).await?;
        if current.is_active == active {
            return Ok(current.version);
        }
        let mut draft = current.to_draft();
        draft.is_active = active;
        self.update_workflow(id, draft).await
    }

    pub async fn get_workflow(&self, id: Uuid) -> Result<Arc<WorkflowDefinition>> {
        self.inner
            .registry
            .read()
            .await
            .current(id)
            .ok_or_else(|| Error::NotFound(format!("workflow {id}")))
    }

    pub async fn find_workflow(&self, name: &str) -> Result<Arc<WorkflowDefinition>> {
        self.inner
            .registry
            .read()
            .await
            .find_by_name(name)
            .ok_or_else(|| Error::NotFound(format!("workflow '{name}'")))
    }

    pub async fn list_workflows(&self) -> Vec<Arc<WorkflowDefinition>> {
        self.inner.registry.read().await.list()
    }

    /// Replaces a workflow's trigger, creating a new version.
    pub async fn register_trigger(&self, registration: TriggerRegistration) -> Result<u32> {
        let workflow_id = registration.workflow_id;
        let trigger = registration.into_spec()?;
        let mut draft = self.get_workflow(workflow_id).await?.to_draft();
        draft.trigger = trigger;
        self.update_workflow(workflow_id, draft).await
    }

    pub fn register_action_handler(&self, action_type: ActionType, handler: Arc<dyn ActionHandler>) {
        tracing::debug!(action_type = %action_type, "registering action handler");
        self.inner.actions.register(action_type, handler);
    }

    pub fn register_event_handler<F, Fut>(&self, event_type: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let callback: EventCallback = Arc::new(move |payload| handler(payload).boxed());
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type.into())
            .or_default()
            .push(callback);
    }

    /// Runs a workflow to completion and returns its final record. Inactive
    /// workflows may still be run by hand.
    pub async fn execute_workflow(
        &self,
        workflow_id: Uuid,
        trigger: TriggerContext,
    ) -> Result<ExecutionRecord> {
        let (definition, execution_id, permit) = self.admit(workflow_id, &trigger).await?;
        self.run_admitted(definition, execution_id, trigger, permit)
            .await
    }

    /// Admits and starts a workflow in the background, returning the
    /// execution id as soon as the record exists.
    pub async fn submit_workflow(&self, workflow_id: Uuid, trigger: TriggerContext) -> Result<Uuid> {
        let (definition, execution_id, permit) = self.admit(workflow_id, &trigger).await?;
        self.spawn_execution(definition, execution_id, trigger, permit);
        Ok(execution_id)
    }

    pub async fn get_execution_status(&self, execution_id: Uuid) -> Result<ExecutionRecord> {
        self.inner.tracker.get(execution_id).await
    }

    pub async fn cancel_execution(&self, execution_id: Uuid) -> Result<ExecutionRecord> {
        self.inner.tracker.request_cancel(execution_id).await
    }

    /// Executions of this process merged over persisted history, oldest first.
    pub async fn list_executions(&self, workflow_id: Option<Uuid>) -> Result<Vec<ExecutionRecord>> {
        let persisted = self.inner.collaborators.executions.list(workflow_id).await?;
        let mut merged: HashMap<Uuid, ExecutionRecord> = persisted
            .into_iter()
            .map(|record| (record.id, record))
            .collect();
        for record in self.inner.tracker.list(workflow_id).await {
            merged.insert(record.id, record);
        }

        let mut records: Vec<ExecutionRecord> = merged.into_values().collect();
        records.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then(left.id.cmp(&right.id))
        });
        Ok(records)
    }

    pub async fn workflow_stats(&self) -> WorkflowStats {
        let (total_workflows, active_workflows) = {
            let registry = self.inner.registry.read().await;
            let workflows = registry.list();
            let active = workflows.iter().filter(|workflow| workflow.is_active).count();
            (workflows.len(), active)
        };
        let executions = self.inner.tracker.counts().await;
        let finished = executions.completed + executions.failed + executions.cancelled;
        let success_rate = (finished > 0).then(|| executions.completed as f64 / finished as f64);
        let average_runtime_ms = executions.average_runtime_ms;

        WorkflowStats {
            total_workflows,
            active_workflows,
            executions,
            success_rate,
            average_runtime_ms,
        }
    }

    /// Fires every active workflow subscribed to `event_type` whose filter
    /// matches the payload, then runs the registered handlers. Handler
    /// failures are logged and never reach the caller.
    pub async fn trigger_event(&self, event_type: &str, payload: Value) -> Result<Vec<Uuid>> {
        let subscribers = self.inner.registry.read().await.subscribers(event_type);
        let attributes = payload.as_object().cloned().unwrap_or_default();
        let mut started = Vec::new();

        for definition in subscribers {
            if let TriggerSpec::Event { event_filter, .. } = &definition.trigger {
                if !self.inner.evaluator.matches_all(event_filter, &attributes) {
                    tracing::debug!(workflow_id = %definition.id, event_type, "event filter did not match");
                    continue;
                }
            }

            let queued = match self.inner.admission.try_enqueue_event() {
                Ok(queued) => queued,
                Err(err) => {
                    self.drop_firing(definition.id, TriggerKind::Event, None, &err.to_string());
                    continue;
                }
            };

            let trigger = TriggerContext::event(event_type, payload.clone());
            let execution_id = Uuid::new_v4();
            if let Err(err) = self
                .inner
                .tracker
                .create(execution_id, &definition, &trigger)
                .await
            {
                tracing::error!(workflow_id = %definition.id, error = %err, "failed to create event execution");
                continue;
            }

            let engine = self.clone();
            tokio::spawn(async move {
                let permit = match engine.inner.admission.admit_event(queued).await {
                    Ok(permit) => permit,
                    Err(err) => {
                        tracing::error!(execution_id = %execution_id, error = %err, "event execution not admitted");
                        return;
                    }
                };
                if let Err(err) = engine
                    .run_admitted(definition, execution_id, trigger, permit)
                    .await
                {
                    tracing::error!(execution_id = %execution_id, error = %err, "event execution ended with error");
                }
            });
            started.push(execution_id);
        }

        self.run_event_handlers(event_type, &payload).await;
        Ok(started)
    }

    /// Re-anchors every scheduled job at its workflow's last recorded run, so
    /// firings missed while the engine was down coalesce into one.
    pub async fn resume_schedules(&self) {
        let scheduled = self.inner.registry.read().await.scheduled();
        let mut anchors = Vec::new();
        for definition in scheduled {
            match self.inner.collaborators.executions.last_run(definition.id).await {
                Ok(Some(last_run)) => anchors.push((definition.id, last_run)),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(workflow_id = %definition.id, error = %err, "failed to read last run; schedule starts now");
                }
            }
        }

        let mut cron = self.lock_cron();
        for (workflow_id, anchor) in anchors {
            cron.set_anchor(workflow_id, anchor);
            tracing::debug!(workflow_id = %workflow_id, anchor = %anchor, "schedule resumed");
        }
    }

    /// One scheduler pass at `now`. Returns the executions it dispatched.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        let decisions = self.lock_cron().due(now);
        let mut dispatched = Vec::new();

        for decision in decisions {
            match decision {
                ScheduleDecision::Fire {
                    workflow_id,
                    nominal,
                    coalesced,
                } => {
                    if let Some(execution_id) =
                        self.dispatch_scheduled(workflow_id, nominal, coalesced).await
                    {
                        dispatched.push(execution_id);
                    }
                }
                ScheduleDecision::Drop {
                    workflow_id,
                    nominal,
                } => {
                    self.drop_firing(
                        workflow_id,
                        TriggerKind::Scheduled,
                        Some(nominal),
                        "firing is past the misfire grace window",
                    );
                }
            }
        }
        dispatched
    }

    /// Resumes schedules and starts the background ticker. Calling it again
    /// replaces the previous ticker.
    pub async fn start(&self) {
        self.resume_schedules().await;

        let token = CancellationToken::new();
        if let Some(previous) = self
            .inner
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone())
        {
            previous.cancel();
        }

        let engine = self.clone();
        let period = Duration::from_millis(self.inner.config.scheduler.tick_interval_ms.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(tick_ms = period.as_millis() as u64, "scheduler started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        engine.tick(Utc::now()).await;
                    }
                }
            }
            tracing::info!("scheduler stopped");
        });
    }

    pub fn stop(&self) {
        if let Some(token) = self
            .inner
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            token.cancel();
        }
    }

    pub fn next_fire_time(&self, workflow_id: Uuid) -> Option<DateTime<Utc>> {
        self.lock_cron().next_fire_time(workflow_id)
    }

    async fn admit(
        &self,
        workflow_id: Uuid,
        trigger: &TriggerContext,
    ) -> Result<(Arc<WorkflowDefinition>, Uuid, ExecutionPermit)> {
        let definition = self.get_workflow(workflow_id).await?;
        let permit = self.inner.admission.try_admit(workflow_id).map_err(|err| {
            tracing::warn!(workflow_id = %workflow_id, error = %err, "execution rejected");
            err
        })?;
        let execution_id = Uuid::new_v4();
        self.inner
            .tracker
            .create(execution_id, &definition, trigger)
            .await?;
        Ok((definition, execution_id, permit))
    }

    fn spawn_execution(
        &self,
        definition: Arc<WorkflowDefinition>,
        execution_id: Uuid,
        trigger: TriggerContext,
        permit: ExecutionPermit,
    ) {
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(err) = engine
                .run_admitted(definition, execution_id, trigger, permit)
                .await
            {
                tracing::error!(execution_id = %execution_id, error = %err, "execution ended with error");
            }
        });
    }

    async fn dispatch_scheduled(
        &self,
        workflow_id: Uuid,
        nominal: DateTime<Utc>,
        coalesced: usize,
    ) -> Option<Uuid> {
        let definition = self.inner.registry.read().await.current(workflow_id);
        let Some(definition) = definition.filter(|definition| {
            definition.is_active && matches!(definition.trigger, TriggerSpec::Scheduled { .. })
        }) else {
            self.lock_cron().remove(workflow_id);
            return None;
        };

        let permit = match self.inner.admission.try_admit(workflow_id) {
            Ok(permit) => permit,
            Err(err) => {
                self.drop_firing(workflow_id, TriggerKind::Scheduled, Some(nominal), &err.to_string());
                return None;
            }
        };

        if coalesced > 0 {
            tracing::info!(workflow_id = %workflow_id, coalesced, "coalesced missed firings");
        }
        let trigger = TriggerContext::scheduled(json!({
            "scheduled_for": nominal.to_rfc3339_opts(SecondsFormat::Secs, true),
            "coalesced": coalesced,
        }));
        let execution_id = Uuid::new_v4();
        if let Err(err) = self
            .inner
            .tracker
            .create(execution_id, &definition, &trigger)
            .await
        {
            tracing::error!(workflow_id = %workflow_id, error = %err, "failed to create scheduled execution");
            return None;
        }

        self.spawn_execution(definition, execution_id, trigger, permit);
        Some(execution_id)
    }

    /// Drives an admitted execution from `Pending` to a terminal state. The
    /// permit is held until the execution finishes.
    async fn run_admitted(
        &self,
        definition: Arc<WorkflowDefinition>,
        execution_id: Uuid,
        trigger: TriggerContext,
        _permit: ExecutionPermit,
    ) -> Result<ExecutionRecord> {
        let tracker = &self.inner.tracker;
        match tracker.start(execution_id).await {
            Ok(_) => {}
            // Cancelled while waiting for admission, and possibly already
            // evicted to persistence.
            Err(Error::InvalidState(_) | Error::NotFound(_)) => {
                return tracker.get(execution_id).await
            }
            Err(err) => return Err(err),
        }
        tracing::info!(
            execution_id = %execution_id,
            workflow_id = %definition.id,
            version = definition.version,
            trigger = trigger.kind.as_str(),
            "execution started"
        );

        match self.run_loop(&definition, execution_id, &trigger).await {
            Ok(LoopOutcome::Completed) => tracker.complete(execution_id).await,
            Ok(LoopOutcome::Cancelled) => tracker.mark_cancelled(execution_id).await,
            Err(err) => {
                tracing::error!(execution_id = %execution_id, error = %err, "execution failed");
                tracker.fail(execution_id, err.to_string()).await
            }
        }
    }

    async fn run_loop(
        &self,
        definition: &WorkflowDefinition,
        execution_id: Uuid,
        trigger: &TriggerContext,
    ) -> Result<LoopOutcome> {
        let cancel = self.inner.tracker.cancellation_token(execution_id).await?;
        let files = self.resolve_files(trigger).await?;
        let context = execution_context(definition, execution_id, trigger, files.len());

        let mut ctx = ActionContext {
            execution_id,
            workflow_id: definition.id,
            workflow_name: definition.name.clone(),
            step_id: String::new(),
            files,
            context,
            collaborators: self.inner.collaborators.clone(),
            sorting: self.inner.sorting,
            timeout: Duration::from_secs(self.inner.config.execution.default_action_timeout_seconds),
        };

        self.inner
            .executor
            .run_steps(&definition.steps, &mut ctx, &self.inner.tracker, &cancel)
            .await
    }

    async fn resolve_files(&self, trigger: &TriggerContext) -> Result<Vec<FileRecord>> {
        let store = &self.inner.collaborators.files;
        match &trigger.file_ids {
            Some(ids) => {
                let mut files = Vec::with_capacity(ids.len());
                for id in ids {
                    files.push(store.get(id).await?);
                }
                Ok(files)
            }
            None => store.list().await,
        }
    }

    async fn run_event_handlers(&self, event_type: &str, payload: &Value) {
        let callbacks = self
            .inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .cloned()
            .unwrap_or_default();

        for (index, callback) in callbacks.iter().enumerate() {
            let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| callback(payload.clone()))) {
                Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
                Err(panic) => Err(panic),
            };
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(event_type, handler = index, error = %err, "event handler failed");
                }
                Err(panic) => {
                    tracing::warn!(
                        event_type,
                        handler = index,
                        panic = %panic_message(panic.as_ref()),
                        "event handler panicked"
                    );
                }
            }
        }
    }

    fn drop_firing(
        &self,
        workflow_id: Uuid,
        trigger: TriggerKind,
        nominal_time: Option<DateTime<Utc>>,
        reason: &str,
    ) {
        tracing::warn!(
            workflow_id = %workflow_id,
            trigger = trigger.as_str(),
            nominal_time = ?nominal_time,
            reason,
            "firing dropped"
        );
        self.inner.events.publish(Event::FiringDropped {
            workflow_id,
            trigger,
            nominal_time,
            reason: reason.to_owned(),
        });
    }

    fn sync_schedule(&self, definition: &WorkflowDefinition) -> Result<()> {
        let mut cron = self.lock_cron();
        match &definition.trigger {
            TriggerSpec::Scheduled { cron_expression } if definition.is_active => {
                if cron.expression(definition.id) != Some(cron_expression.as_str()) {
                    cron.upsert(definition.id, cron_expression, Utc::now())?;
                }
            }
            _ => {
                cron.remove(definition.id);
            }
        }
        Ok(())
    }

    fn lock_cron(&self) -> MutexGuard<'_, CronTable> {
        self.inner.cron.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn execution_context(
    definition: &WorkflowDefinition,
    execution_id: Uuid,
    trigger: &TriggerContext,
    file_count: usize,
) -> AttributeMap {
    let mut context = match &trigger.payload {
        Value::Object(map) => map.clone(),
        Value::Null => AttributeMap::new(),
        other => {
            let mut map = AttributeMap::new();
            map.insert("payload".to_owned(), other.clone());
            map
        }
    };
    context.insert("trigger_type".to_owned(), json!(trigger.kind.as_str()));
    if let Some(event_type) = &trigger.event_type {
        context.insert("event_type".to_owned(), json!(event_type));
    }
    context.insert("workflow_id".to_owned(), json!(definition.id.to_string()));
    context.insert("execution_id".to_owned(), json!(execution_id.to_string()));
    context.insert("file_count".to_owned(), json!(file_count));
    context
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use super::{execution_context, WorkflowEngine};
    use crate::config::Config;
    use crate::error::Error;
    use crate::rules::condition::Condition;
    use crate::runtime::Collaborators;
    use crate::workflows::trigger::{TriggerContext, TriggerRegistration, TriggerSpec};
    use crate::workflows::types::{Action, ActionType, StepDefinition, WorkflowDefinition, WorkflowDraft};

    fn engine() -> WorkflowEngine {
        WorkflowEngine::new(Config::default(), Collaborators::in_memory()).expect("engine")
    }

    #[tokio::test]
    async fn rejects_malformed_drafts() {
        let engine = engine();
        let draft = WorkflowDraft::new("broken").with_step(
            StepDefinition::new("s1", "bad condition").when(Condition::equals("", json!(1))),
        );
        let err = engine.create_workflow(draft).await.expect_err("empty field");
        assert!(matches!(err, Error::Validation(_)));

        let draft = WorkflowDraft::new("bad cron").with_trigger(TriggerSpec::Scheduled {
            cron_expression: "every tuesday".to_owned(),
        });
        let err = engine.create_workflow(draft).await.expect_err("bad cron");
        assert!(matches!(err, Error::Validation(_)));
        assert!(engine.list_workflows().await.is_empty());
    }

    #[tokio::test]
    async fn updates_create_new_versions() {
        let engine = engine();
        let id = engine
            .create_workflow(WorkflowDraft::new("tidy"))
            .await
            .expect("create");

        let mut draft = engine.get_workflow(id).await.expect("get").to_draft();
        draft.description = "now with notifications".to_owned();
        draft.steps.push(StepDefinition::new("notify", "Notify").then(Action::new(
            ActionType::SendNotification,
            json!({"message": "done"}),
        )));
        assert_eq!(engine.update_workflow(id, draft).await.expect("update"), 2);
        assert_eq!(engine.set_workflow_active(id, false).await.expect("deactivate"), 3);
        assert_eq!(engine.set_workflow_active(id, false).await.expect("no-op"), 3);

        let current = engine.get_workflow(id).await.expect("get");
        assert_eq!(current.version, 3);
        assert!(!current.is_active);
        assert_eq!(current.steps.len(), 1);

        let err = engine
            .update_workflow(Uuid::new_v4(), WorkflowDraft::new("ghost"))
            .await
            .expect_err("unknown workflow");
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn trigger_registration_reschedules() {
        let engine = engine();
        let id = engine
            .create_workflow(WorkflowDraft::new("nightly"))
            .await
            .expect("create");
        assert!(engine.next_fire_time(id).is_none());

        let registration: TriggerRegistration = serde_json::from_value(json!({
            "workflowId": id,
            "triggerType": "scheduled",
            "triggerConfig": {"cronExpression": "0 2 * * *"}
        }))
        .expect("registration");
        assert_eq!(engine.register_trigger(registration).await.expect("register"), 2);
        assert!(engine.next_fire_time(id).is_some());

        engine.set_workflow_active(id, false).await.expect("deactivate");
        assert!(engine.next_fire_time(id).is_none());
    }

    #[tokio::test]
    async fn scheduled_firing_past_grace_is_dropped() {
        let engine = engine();
        let id = engine
            .create_workflow(WorkflowDraft::new("minutely").with_trigger(TriggerSpec::Scheduled {
                cron_expression: "0 * * * * *".to_owned(),
            }))
            .await
            .expect("create");
        let mut events = engine.subscribe();

        let anchor = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).single().expect("anchor");
        engine.lock_cron().set_anchor(id, anchor);
        let dispatched = engine.tick(anchor + ChronoDuration::seconds(100)).await;
        assert!(dispatched.is_empty());

        match events.try_recv().expect("drop event") {
            crate::events::Event::FiringDropped { workflow_id, .. } => assert_eq!(workflow_id, id),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn execution_context_merges_payload_and_metadata() {
        let definition = WorkflowDefinition::from_draft(Uuid::new_v4(), 1, WorkflowDraft::new("ctx"));
        let execution_id = Uuid::new_v4();
        let trigger = TriggerContext::event("file.uploaded", json!({"folder": "inbox"}));

        let context = execution_context(&definition, execution_id, &trigger, 4);
        assert_eq!(context["folder"], json!("inbox"));
        assert_eq!(context["trigger_type"], json!("event"));
        assert_eq!(context["event_type"], json!("file.uploaded"));
        assert_eq!(context["file_count"], json!(4));
        assert_eq!(context["execution_id"], json!(execution_id.to_string()));
    }
}
