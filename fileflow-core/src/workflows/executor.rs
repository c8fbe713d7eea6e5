use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::rules::evaluator::RuleEvaluator;
use crate::workflows::actions::{ActionContext, ActionRegistry};
use crate::workflows::tracker::{ActionResult, ExecutionTracker, StepResult, StepStatus};
use crate::workflows::types::{Action, StepDefinition};

pub const UNKNOWN_ACTION_REASON: &str = "unknown action type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    Completed,
    Cancelled,
}

/// Runs workflow steps in order. Each step is gated by its conditions; each
/// action is isolated so one failure never stops the next.
#[derive(Clone)]
pub struct StepExecutor {
    evaluator: RuleEvaluator,
    actions: Arc<ActionRegistry>,
    default_action_timeout: Duration,
}

impl StepExecutor {
    pub fn new(actions: Arc<ActionRegistry>, default_action_timeout: Duration) -> Self {
        Self {
            evaluator: RuleEvaluator::new(),
            actions,
            default_action_timeout,
        }
    }

    /// Runs every step, recording each result as it finishes. Cancellation is
    /// honoured once the current step finishes, including the last one. Only
    /// tracker failures escape as errors.
    pub async fn run_steps(
        &self,
        steps: &[StepDefinition],
        ctx: &mut ActionContext,
        tracker: &ExecutionTracker,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome> {
        for step in steps {
            if cancel.is_cancelled() {
                tracing::info!(
                    execution_id = %ctx.execution_id,
                    next_step = %step.id,
                    "cancellation observed between steps"
                );
                return Ok(LoopOutcome::Cancelled);
            }

            let result = self.run_step(step, ctx).await;
            tracker.record_step(ctx.execution_id, result).await?;
        }

        if cancel.is_cancelled() {
            tracing::info!(
                execution_id = %ctx.execution_id,
                "cancellation observed after the last step"
            );
            return Ok(LoopOutcome::Cancelled);
        }
        Ok(LoopOutcome::Completed)
    }

    pub async fn run_step(&self, step: &StepDefinition, ctx: &mut ActionContext) -> StepResult {
        let started_at = Utc::now();
        ctx.step_id = step.id.clone();
        let mut actions = Vec::with_capacity(step.actions.len());

        let body = AssertUnwindSafe(self.step_body(step, ctx, &mut actions))
            .catch_unwind()
            .await;
        let (status, error) = match body {
            Ok(status) => (status, None),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    execution_id = %ctx.execution_id,
                    step_id = %step.id,
                    error = %message,
                    "step panicked"
                );
                (StepStatus::Failed, Some(format!("step panicked: {message}")))
            }
        };

        tracing::debug!(
            execution_id = %ctx.execution_id,
            step_id = %step.id,
            status = ?status,
            actions = actions.len(),
            "step finished"
        );
        StepResult {
            step_id: step.id.clone(),
            name: step.name.clone(),
            status,
            actions,
            error,
            started_at,
            completed_at: Utc::now(),
        }
    }

    async fn step_body(
        &self,
        step: &StepDefinition,
        ctx: &mut ActionContext,
        results: &mut Vec<ActionResult>,
    ) -> StepStatus {
        if !self.evaluator.matches_all(&step.conditions, &ctx.context) {
            tracing::debug!(step_id = %step.id, "step conditions not met; skipping");
            return StepStatus::Skipped;
        }

        for action in &step.actions {
            let result = self.run_action(action, ctx).await;
            results.push(result);
        }
        StepStatus::Completed
    }

    async fn run_action(&self, action: &Action, ctx: &mut ActionContext) -> ActionResult {
        let action_type = action.action_type.as_str().to_owned();
        let Some(handler) = self.actions.get(&action.action_type) else {
            tracing::warn!(action_type = %action_type, "no handler for action type; skipping");
            return ActionResult::skipped(action_type, UNKNOWN_ACTION_REASON);
        };

        let budget = action_timeout(&action.params).unwrap_or(self.default_action_timeout);
        ctx.timeout = budget;

        match tokio::time::timeout(budget, handler.execute(ctx, &action.params)).await {
            Ok(Ok(output)) => ActionResult::completed(action_type, output),
            Ok(Err(err)) => {
                tracing::warn!(
                    execution_id = %ctx.execution_id,
                    step_id = %ctx.step_id,
                    action_type = %action_type,
                    error = %err,
                    "action failed"
                );
                ActionResult::failed(action_type, err.to_string())
            }
            Err(_) => {
                let message = format!("action timed out after {}", format_budget(budget));
                tracing::warn!(
                    execution_id = %ctx.execution_id,
                    step_id = %ctx.step_id,
                    action_type = %action_type,
                    "{message}"
                );
                ActionResult::failed(action_type, message)
            }
        }
    }
}

/// `timeout_ms` wins over `timeout_seconds`.
fn action_timeout(params: &Value) -> Option<Duration> {
    if let Some(millis) = params.get("timeout_ms").and_then(Value::as_u64) {
        return Some(Duration::from_millis(millis));
    }
    params
        .get("timeout_seconds")
        .and_then(Value::as_u64)
        .map(Duration::from_secs)
}

fn format_budget(budget: Duration) -> String {
    if budget.subsec_millis() == 0 {
        format!("{}s", budget.as_secs())
    } else {
        format!("{}ms", budget.as_millis())
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
