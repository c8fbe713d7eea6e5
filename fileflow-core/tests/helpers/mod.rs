#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fileflow_core::config::Config;
use fileflow_core::error::{Error, Result};
use fileflow_core::rules::SortingRule;
use fileflow_core::runtime::Collaborators;
use fileflow_core::storage::memory::{
    MemoryExecutionStore, MemoryFileStore, MemoryNotificationSink, MemoryRuleStore,
};
use fileflow_core::storage::model::FileRecord;
use fileflow_core::storage::ExecutionPersistence;
use fileflow_core::workflows::{
    ActionContext, ActionHandler, ExecutionRecord, WorkflowEngine,
};
use serde_json::{json, Value};
use tokio::sync::Notify;
use uuid::Uuid;

pub struct TestApp {
    pub engine: WorkflowEngine,
    pub notifications: Arc<MemoryNotificationSink>,
    pub files: Arc<MemoryFileStore>,
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(Config::default(), Vec::new(), Vec::new())
}

pub fn setup_test_app_with(
    config: Config,
    files: Vec<FileRecord>,
    rules: Vec<SortingRule>,
) -> TestApp {
    setup_test_app_with_persistence(config, files, rules, Arc::new(MemoryExecutionStore::new()))
}

pub fn setup_test_app_with_persistence(
    config: Config,
    files: Vec<FileRecord>,
    rules: Vec<SortingRule>,
    executions: Arc<dyn ExecutionPersistence>,
) -> TestApp {
    let notifications = Arc::new(MemoryNotificationSink::new());
    let files = Arc::new(MemoryFileStore::new(files));
    let collaborators = Collaborators::in_memory()
        .with_files(files.clone())
        .with_rules(Arc::new(MemoryRuleStore::new(rules)))
        .with_notifications(notifications.clone())
        .with_executions(executions);
    let engine = WorkflowEngine::new(config, collaborators).expect("engine should build");

    TestApp {
        engine,
        notifications,
        files,
    }
}

pub fn file(id: &str, filename: &str, file_type: &str, size: u64) -> FileRecord {
    let attributes = json!({
        "filename": filename,
        "fileType": file_type,
        "size": size,
    });
    FileRecord::new(id, attributes.as_object().cloned().unwrap_or_default())
}

/// Three images and two documents with distinct sizes.
pub fn mixed_files() -> Vec<FileRecord> {
    vec![
        file("img-small", "beach.jpg", "image", 1_200),
        file("doc-report", "report.pdf", "document", 48_000),
        file("img-large", "panorama.png", "image", 9_800),
        file("doc-notes", "notes.txt", "document", 300),
        file("img-medium", "cat.jpg", "image", 4_500),
    ]
}

pub async fn wait_for_terminal(engine: &WorkflowEngine, execution_id: Uuid) -> ExecutionRecord {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match engine.get_execution_status(execution_id).await {
                Ok(record) if record.is_terminal() => return record,
                Ok(_) | Err(Error::NotFound(_)) => {}
                Err(err) => panic!("status lookup failed: {err}"),
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("execution should finish within 5s")
}

/// Action that parks until released, so a test can act while a step runs.
#[derive(Default)]
pub struct GateAction {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl ActionHandler for GateAction {
    async fn execute(&self, _ctx: &mut ActionContext, _params: &Value) -> Result<Value> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(json!({"released": true}))
    }
}

/// Execution persistence whose updates can be switched to fail.
#[derive(Default)]
pub struct FlakyPersistence {
    inner: MemoryExecutionStore,
    fail_updates: AtomicBool,
}

impl FlakyPersistence {
    pub fn failing_updates() -> Self {
        let store = Self::default();
        store.fail_updates.store(true, Ordering::SeqCst);
        store
    }
}

#[async_trait]
impl ExecutionPersistence for FlakyPersistence {
    async fn append(&self, record: &ExecutionRecord) -> Result<()> {
        self.inner.append(record).await
    }

    async fn update(&self, record: &ExecutionRecord) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::Storage("execution store unavailable".to_owned()));
        }
        self.inner.update(record).await
    }

    async fn load(&self, id: Uuid) -> Result<Option<ExecutionRecord>> {
        self.inner.load(id).await
    }

    async fn list(&self, workflow_id: Option<Uuid>) -> Result<Vec<ExecutionRecord>> {
        self.inner.list(workflow_id).await
    }

    async fn last_run(&self, workflow_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        self.inner.last_run(workflow_id).await
    }
}
