use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::ExecutionPersistence;
use crate::workflows::tracker::ExecutionRecord;
use crate::workflows::trigger::TriggerKind;

const SCHEMA_V1: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL PRIMARY KEY)",
    "INSERT OR IGNORE INTO schema_version(version) VALUES (0)",
    "CREATE TABLE IF NOT EXISTS executions (id TEXT PRIMARY KEY, workflow_id TEXT NOT NULL, workflow_version INTEGER NOT NULL, status TEXT NOT NULL, trigger_type TEXT NOT NULL, created_at TEXT NOT NULL, started_at TEXT, completed_at TEXT, record_json TEXT NOT NULL)",
    "CREATE INDEX IF NOT EXISTS idx_executions_workflow_created_at ON executions(workflow_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_executions_workflow_trigger ON executions(workflow_id, trigger_type, created_at)",
    "UPDATE schema_version SET version = 1",
];

/// Execution history in SQLite. Each row keeps the full record as JSON next
/// to the columns used for lookups.
#[derive(Debug, Clone)]
pub struct SqliteExecutionStore {
    pool: sqlx::SqlitePool,
    initialized: std::sync::Arc<OnceCell<()>>,
}

impl SqliteExecutionStore {
    pub fn new(connection_string: &str, pool_size: usize) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(connection_string)
            .map_err(|err| {
                Error::Storage(format!(
                    "invalid SQLite connection string '{connection_string}': {err}"
                ))
            })?
            .create_if_missing(true);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size.max(1) as u32)
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            initialized: std::sync::Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_initialized(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| async {
                for statement in SCHEMA_V1 {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(Error::from)
            .map(|_| ())
    }

    fn format_timestamp(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(|err| Error::Storage(format!("failed to parse timestamp '{value}': {err}")))
    }

    fn decode_record(raw: &str) -> Result<ExecutionRecord> {
        serde_json::from_str(raw)
            .map_err(|err| Error::Storage(format!("corrupt execution record: {err}")))
    }
}

#[async_trait]
impl ExecutionPersistence for SqliteExecutionStore {
    async fn append(&self, record: &ExecutionRecord) -> Result<()> {
        self.ensure_initialized().await?;

        sqlx::query(
            "INSERT INTO executions(id, workflow_id, workflow_version, status, trigger_type, created_at, started_at, completed_at, record_json) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(record.workflow_id.to_string())
        .bind(i64::from(record.workflow_version))
        .bind(record.status.as_str())
        .bind(record.trigger.as_str())
        .bind(Self::format_timestamp(&record.created_at))
        .bind(record.started_at.as_ref().map(Self::format_timestamp))
        .bind(record.completed_at.as_ref().map(Self::format_timestamp))
        .bind(serde_json::to_string(record)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, record: &ExecutionRecord) -> Result<()> {
        self.ensure_initialized().await?;

        let result = sqlx::query(
            "UPDATE executions SET status = ?, started_at = ?, completed_at = ?, record_json = ? WHERE id = ?",
        )
        .bind(record.status.as_str())
        .bind(record.started_at.as_ref().map(Self::format_timestamp))
        .bind(record.completed_at.as_ref().map(Self::format_timestamp))
        .bind(serde_json::to_string(record)?)
        .bind(record.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("execution {}", record.id)));
        }
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<ExecutionRecord>> {
        self.ensure_initialized().await?;

        let row = sqlx::query("SELECT record_json FROM executions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::decode_record(&row.get::<String, _>("record_json")))
            .transpose()
    }

    async fn list(&self, workflow_id: Option<Uuid>) -> Result<Vec<ExecutionRecord>> {
        self.ensure_initialized().await?;

        let query = if let Some(workflow_id) = workflow_id {
            sqlx::query(
                "SELECT record_json FROM executions WHERE workflow_id = ? ORDER BY created_at ASC",
            )
            .bind(workflow_id.to_string())
        } else {
            sqlx::query("SELECT record_json FROM executions ORDER BY created_at ASC")
        };

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| Self::decode_record(&row.get::<String, _>("record_json")))
            .collect()
    }

    async fn last_run(&self, workflow_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        self.ensure_initialized().await?;

        let row = sqlx::query(
            "SELECT created_at FROM executions WHERE workflow_id = ? AND trigger_type = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(workflow_id.to_string())
        .bind(TriggerKind::Scheduled.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::parse_timestamp(&row.get::<String, _>("created_at")))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::SqliteExecutionStore;
    use crate::storage::ExecutionPersistence;
    use crate::workflows::tracker::{ExecutionRecord, ExecutionStatus};
    use crate::workflows::trigger::TriggerContext;
    use crate::workflows::types::{WorkflowDefinition, WorkflowDraft};

    fn store(dir: &tempfile::TempDir) -> SqliteExecutionStore {
        let path = dir.path().join("nested").join("executions.db");
        SqliteExecutionStore::new(&format!("sqlite://{}", path.display()), 1)
            .expect("store should open")
    }

    #[tokio::test]
    async fn round_trips_execution_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        let workflow =
            WorkflowDefinition::from_draft(Uuid::new_v4(), 2, WorkflowDraft::new("archive"));
        let mut record =
            ExecutionRecord::pending(Uuid::new_v4(), &workflow, &TriggerContext::manual());

        store.append(&record).await.expect("append");
        record.status = ExecutionStatus::Running;
        record.started_at = Some(chrono::Utc::now());
        store.update(&record).await.expect("update");

        let loaded = store
            .load(record.id)
            .await
            .expect("load")
            .expect("record exists");
        assert_eq!(loaded, record);
        assert_eq!(
            store.list(Some(workflow.id)).await.expect("list").len(),
            1
        );
        assert!(store.load(Uuid::new_v4()).await.expect("load").is_none());
    }

    #[tokio::test]
    async fn last_run_only_counts_scheduled_executions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        let workflow =
            WorkflowDefinition::from_draft(Uuid::new_v4(), 1, WorkflowDraft::new("nightly"));

        let manual = ExecutionRecord::pending(Uuid::new_v4(), &workflow, &TriggerContext::manual());
        store.append(&manual).await.expect("append manual");
        assert_eq!(store.last_run(workflow.id).await.expect("last run"), None);

        let scheduled = ExecutionRecord::pending(
            Uuid::new_v4(),
            &workflow,
            &TriggerContext::scheduled(serde_json::Value::Null),
        );
        store.append(&scheduled).await.expect("append scheduled");
        let last = store
            .last_run(workflow.id)
            .await
            .expect("last run")
            .expect("scheduled run recorded");
        assert_eq!(
            last.timestamp_micros(),
            scheduled.created_at.timestamp_micros()
        );
    }
}
