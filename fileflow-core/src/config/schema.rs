use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub scheduler: SchedulerConfig,
    pub execution: ExecutionConfig,
    pub storage: StorageConfig,
    pub workflows: WorkflowsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
            with_target: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_interval_ms: u64,
    /// How late a cron firing may start after its nominal time before it is dropped.
    pub misfire_grace_seconds: u64,
    pub max_instances_per_workflow: usize,
    pub max_concurrent_executions: usize,
    pub max_queued_events: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            misfire_grace_seconds: 30,
            max_instances_per_workflow: 3,
            max_concurrent_executions: 16,
            max_queued_events: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub default_action_timeout_seconds: u64,
    pub event_bus_capacity: usize,
    /// Finished executions kept in memory; older ones are served from
    /// execution persistence.
    pub retained_executions: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_action_timeout_seconds: 300,
            event_bus_capacity: 128,
            retained_executions: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub sqlite_path: String,
    pub connection_string_prefix: String,
    pub pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Memory,
            sqlite_path: ".fileflow/executions.db".to_owned(),
            connection_string_prefix: "sqlite://".to_owned(),
            pool_size: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowsConfig {
    pub directories: Vec<String>,
    pub max_discovery_depth: usize,
    pub rules_file: Option<String>,
    pub files_file: Option<String>,
    pub report_dir: String,
    pub script_working_dir: Option<String>,
}

impl Default for WorkflowsConfig {
    fn default() -> Self {
        Self {
            directories: vec![".fileflow/workflows".to_owned()],
            max_discovery_depth: 3,
            rules_file: None,
            files_file: None,
            report_dir: ".fileflow/reports".to_owned(),
            script_working_dir: None,
        }
    }
}
