mod helpers;

use std::sync::{Arc, Mutex};

use fileflow_core::error::Error;
use fileflow_core::rules::Condition;
use fileflow_core::workflows::{
    ExecutionStatus, TriggerKind, TriggerSpec, WorkflowDraft,
};
use helpers::{setup_test_app, wait_for_terminal};
use serde_json::{json, Value};

fn upload_listener(filter: Vec<Condition>) -> WorkflowDraft {
    WorkflowDraft::new("upload listener").with_trigger(TriggerSpec::Event {
        event_type: "file.uploaded".to_owned(),
        event_filter: filter,
    })
}

#[tokio::test]
async fn test_handler_failures_never_reach_the_caller() {
    let app = setup_test_app();
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));

    app.engine.register_event_handler("file.uploaded", |_payload| async {
        Err(Error::Action("webhook unreachable".to_owned()))
    });
    app.engine.register_event_handler("file.uploaded", |payload: Value| async move {
        if payload.is_object() {
            panic!("handler bug");
        }
        Ok(())
    });
    let recorder = seen.clone();
    app.engine.register_event_handler("file.uploaded", move |payload| {
        let recorder = recorder.clone();
        async move {
            recorder.lock().expect("lock").push(payload);
            Ok(())
        }
    });

    let started = app
        .engine
        .trigger_event("file.uploaded", json!({"folder": "inbox"}))
        .await
        .expect("trigger_event must not fail");

    assert!(started.is_empty());
    let seen = seen.lock().expect("lock");
    assert_eq!(seen.as_slice(), &[json!({"folder": "inbox"})]);
}

#[tokio::test]
async fn test_event_filter_selects_matching_payloads() {
    let app = setup_test_app();
    let id = app
        .engine
        .create_workflow(upload_listener(vec![Condition::equals("folder", json!("inbox"))]))
        .await
        .expect("create");

    let ignored = app
        .engine
        .trigger_event("file.uploaded", json!({"folder": "outbox"}))
        .await
        .expect("trigger");
    assert!(ignored.is_empty());

    let other_type = app
        .engine
        .trigger_event("file.deleted", json!({"folder": "inbox"}))
        .await
        .expect("trigger");
    assert!(other_type.is_empty());

    let started = app
        .engine
        .trigger_event("file.uploaded", json!({"folder": "inbox"}))
        .await
        .expect("trigger");
    assert_eq!(started.len(), 1);

    let record = wait_for_terminal(&app.engine, started[0]).await;
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.workflow_id, id);
    assert_eq!(record.trigger, TriggerKind::Event);
    assert_eq!(record.event_type.as_deref(), Some("file.uploaded"));
}

#[tokio::test]
async fn test_event_firings_bypass_per_workflow_cap() {
    let mut config = fileflow_core::config::Config::default();
    config.scheduler.max_instances_per_workflow = 1;
    let app = helpers::setup_test_app_with(config, Vec::new(), Vec::new());
    app.engine
        .create_workflow(upload_listener(Vec::new()))
        .await
        .expect("create");

    let mut started = Vec::new();
    for _ in 0..3 {
        started.extend(
            app.engine
                .trigger_event("file.uploaded", json!({}))
                .await
                .expect("trigger"),
        );
    }

    assert_eq!(started.len(), 3);
    for execution_id in started {
        assert_eq!(
            wait_for_terminal(&app.engine, execution_id).await.status,
            ExecutionStatus::Completed
        );
    }
}

#[tokio::test]
async fn test_registered_trigger_payload_creates_event_subscription() {
    let app = setup_test_app();
    let id = app
        .engine
        .create_workflow(WorkflowDraft::new("manual first"))
        .await
        .expect("create");

    let registration = serde_json::from_value(json!({
        "workflowId": id,
        "triggerType": "event",
        "triggerConfig": {
            "eventType": "file.tagged",
            "eventFilter": [{"field": "tags", "operator": "has_tag", "value": "urgent"}]
        }
    }))
    .expect("registration");
    app.engine.register_trigger(registration).await.expect("register");

    let skipped = app
        .engine
        .trigger_event("file.tagged", json!({"tags": ["later"]}))
        .await
        .expect("trigger");
    assert!(skipped.is_empty());

    let started = app
        .engine
        .trigger_event("file.tagged", json!({"tags": ["urgent", "review"]}))
        .await
        .expect("trigger");
    assert_eq!(started.len(), 1);
    wait_for_terminal(&app.engine, started[0]).await;
}
