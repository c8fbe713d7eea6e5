mod helpers;

use std::sync::Arc;

use fileflow_core::config::Config;
use fileflow_core::error::Error;
use fileflow_core::workflows::{
    Action, ActionType, ExecutionStatus, StepDefinition, StepStatus, TriggerContext,
    TriggerSpec, WorkflowDraft,
};
use helpers::{setup_test_app, setup_test_app_with, wait_for_terminal, GateAction};
use serde_json::json;

fn gate_type() -> ActionType {
    ActionType::Custom("gate".to_owned())
}

fn gated_draft(name: &str) -> WorkflowDraft {
    WorkflowDraft::new(name)
        .with_step(StepDefinition::new("hold", "Hold").then(Action::new(gate_type(), json!({}))))
        .with_step(StepDefinition::new("notify", "Notify").then(Action::new(
            ActionType::SendNotification,
            json!({"message": "released"}),
        )))
}

fn single_slot_config() -> Config {
    let mut config = Config::default();
    config.scheduler.max_concurrent_executions = 1;
    config.scheduler.max_instances_per_workflow = 1;
    config
}

#[tokio::test]
async fn test_cancel_running_takes_effect_after_current_step() {
    let app = setup_test_app();
    let gate = Arc::new(GateAction::default());
    app.engine.register_action_handler(gate_type(), gate.clone());
    let id = app.engine.create_workflow(gated_draft("gated")).await.expect("create");

    let execution_id = app
        .engine
        .submit_workflow(id, TriggerContext::manual())
        .await
        .expect("submit");
    gate.entered.notified().await;

    let mid_flight = app.engine.cancel_execution(execution_id).await.expect("cancel");
    assert_eq!(mid_flight.status, ExecutionStatus::Running);
    assert!(mid_flight.cancel_requested);

    gate.release.notify_one();
    let record = wait_for_terminal(&app.engine, execution_id).await;

    assert_eq!(record.status, ExecutionStatus::Cancelled);
    assert_eq!(record.step_results.len(), 1);
    assert_eq!(record.step_results[0].step_id, "hold");
    assert_eq!(record.step_results[0].status, StepStatus::Completed);
    assert!(app.notifications.sent().is_empty());
}

#[tokio::test]
async fn test_cancel_during_last_step_ends_cancelled() {
    let app = setup_test_app();
    let gate = Arc::new(GateAction::default());
    app.engine.register_action_handler(gate_type(), gate.clone());
    let id = app
        .engine
        .create_workflow(
            WorkflowDraft::new("single gate")
                .with_step(StepDefinition::new("hold", "Hold").then(Action::new(gate_type(), json!({})))),
        )
        .await
        .expect("create");

    let execution_id = app
        .engine
        .submit_workflow(id, TriggerContext::manual())
        .await
        .expect("submit");
    gate.entered.notified().await;

    let mid_flight = app.engine.cancel_execution(execution_id).await.expect("cancel");
    assert_eq!(mid_flight.status, ExecutionStatus::Running);
    assert!(mid_flight.cancel_requested);

    gate.release.notify_one();
    let record = wait_for_terminal(&app.engine, execution_id).await;

    assert_eq!(record.status, ExecutionStatus::Cancelled);
    assert!(record.cancel_requested);
    assert_eq!(record.step_results.len(), 1);
    assert_eq!(record.step_results[0].status, StepStatus::Completed);
}

#[tokio::test]
async fn test_cancel_pending_is_immediate() {
    let app = setup_test_app_with(single_slot_config(), Vec::new(), Vec::new());
    let gate = Arc::new(GateAction::default());
    app.engine.register_action_handler(gate_type(), gate.clone());

    let blocker = app.engine.create_workflow(gated_draft("blocker")).await.expect("create");
    let listener = app
        .engine
        .create_workflow(WorkflowDraft::new("listener").with_trigger(TriggerSpec::Event {
            event_type: "file.uploaded".to_owned(),
            event_filter: Vec::new(),
        }))
        .await
        .expect("create listener");

    let running = app
        .engine
        .submit_workflow(blocker, TriggerContext::manual())
        .await
        .expect("submit blocker");
    gate.entered.notified().await;

    let queued = app
        .engine
        .trigger_event("file.uploaded", json!({"folder": "inbox"}))
        .await
        .expect("trigger");
    assert_eq!(queued.len(), 1);
    let pending = app.engine.get_execution_status(queued[0]).await.expect("status");
    assert_eq!(pending.status, ExecutionStatus::Pending);
    assert_eq!(pending.workflow_id, listener);

    let cancelled = app.engine.cancel_execution(queued[0]).await.expect("cancel");
    assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
    assert!(cancelled.started_at.is_none());
    assert!(cancelled.completed_at.is_some());

    gate.release.notify_one();
    assert_eq!(
        wait_for_terminal(&app.engine, running).await.status,
        ExecutionStatus::Completed
    );

    // Once admitted, the cancelled execution must not start.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let after = app.engine.get_execution_status(queued[0]).await.expect("status");
    assert_eq!(after.status, ExecutionStatus::Cancelled);
    assert!(after.step_results.is_empty());
}

#[tokio::test]
async fn test_cancel_terminal_execution_is_a_no_op() {
    let app = setup_test_app();
    let id = app
        .engine
        .create_workflow(WorkflowDraft::new("quick"))
        .await
        .expect("create");
    let record = app
        .engine
        .execute_workflow(id, TriggerContext::manual())
        .await
        .expect("execute");

    let again = app.engine.cancel_execution(record.id).await.expect("cancel");
    assert_eq!(again.status, ExecutionStatus::Completed);
    assert!(!again.cancel_requested);
}

#[tokio::test]
async fn test_per_workflow_cap_rejects_extra_manual_firing() {
    let app = setup_test_app_with(single_slot_config(), Vec::new(), Vec::new());
    let gate = Arc::new(GateAction::default());
    app.engine.register_action_handler(gate_type(), gate.clone());
    let id = app.engine.create_workflow(gated_draft("capped")).await.expect("create");

    let first = app
        .engine
        .submit_workflow(id, TriggerContext::manual())
        .await
        .expect("first firing admitted");
    gate.entered.notified().await;

    let err = app
        .engine
        .execute_workflow(id, TriggerContext::manual())
        .await
        .expect_err("second firing exceeds cap");
    assert!(matches!(err, Error::Capacity(_)));

    gate.release.notify_one();
    assert_eq!(
        wait_for_terminal(&app.engine, first).await.status,
        ExecutionStatus::Completed
    );

    // The slot is free again.
    let gate_release = gate.clone();
    let runner = app.engine.clone();
    let handle = tokio::spawn(async move { runner.execute_workflow(id, TriggerContext::manual()).await });
    gate_release.entered.notified().await;
    gate_release.release.notify_one();
    let record = handle.await.expect("join").expect("third firing admitted");
    assert_eq!(record.status, ExecutionStatus::Completed);
}
