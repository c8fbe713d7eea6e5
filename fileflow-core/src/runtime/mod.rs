use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::storage::factory::create_execution_persistence;
use crate::storage::memory::{
    MemoryExecutionStore, MemoryFileStore, MemoryReportSink, MemoryRuleStore,
};
use crate::storage::{ExecutionPersistence, FileStore, RuleStore};
use crate::tools::{
    JsonFileReportSink, NotificationSink, ReportSink, ScriptRunner, ShellScriptRunner,
    TracingNotificationSink,
};

/// The external services the engine talks to, each behind a narrow trait.
#[derive(Clone)]
pub struct Collaborators {
    pub files: Arc<dyn FileStore>,
    pub rules: Arc<dyn RuleStore>,
    pub notifications: Arc<dyn NotificationSink>,
    pub reports: Arc<dyn ReportSink>,
    pub scripts: Arc<dyn ScriptRunner>,
    pub executions: Arc<dyn ExecutionPersistence>,
}

impl Collaborators {
    /// Empty in-memory stores, log-only notifications, in-memory reports.
    pub fn in_memory() -> Self {
        Self {
            files: Arc::new(MemoryFileStore::default()),
            rules: Arc::new(MemoryRuleStore::default()),
            notifications: Arc::new(TracingNotificationSink),
            reports: Arc::new(MemoryReportSink::new()),
            scripts: Arc::new(ShellScriptRunner::default()),
            executions: Arc::new(MemoryExecutionStore::new()),
        }
    }

    /// Collaborators described by the config: execution persistence backend,
    /// report directory and script working directory. File and rule stores
    /// start empty; callers supply them with [`with_files`](Self::with_files)
    /// and [`with_rules`](Self::with_rules).
    pub fn from_config(config: &Config) -> Result<Self> {
        let scripts = ShellScriptRunner::new(
            config
                .workflows
                .script_working_dir
                .as_ref()
                .map(PathBuf::from),
        );

        Ok(Self {
            files: Arc::new(MemoryFileStore::default()),
            rules: Arc::new(MemoryRuleStore::default()),
            notifications: Arc::new(TracingNotificationSink),
            reports: Arc::new(JsonFileReportSink::new(&config.workflows.report_dir)),
            scripts: Arc::new(scripts),
            executions: create_execution_persistence(config)?,
        })
    }

    pub fn with_files(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = files;
        self
    }

    pub fn with_rules(mut self, rules: Arc<dyn RuleStore>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_notifications(mut self, notifications: Arc<dyn NotificationSink>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_reports(mut self, reports: Arc<dyn ReportSink>) -> Self {
        self.reports = reports;
        self
    }

    pub fn with_scripts(mut self, scripts: Arc<dyn ScriptRunner>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn with_executions(mut self, executions: Arc<dyn ExecutionPersistence>) -> Self {
        self.executions = executions;
        self
    }
}
