//! Collaborator interfaces the engine depends on, plus the file record model
//! and the implementations shipped with the crate.

pub mod factory;
pub mod memory;
pub mod model;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::rules::types::SortingRule;
use crate::storage::model::{AttributeMap, FileRecord};
use crate::workflows::tracker::ExecutionRecord;

/// Owner of file records. The engine reads attribute maps and patches
/// individual keys; it never touches file content.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<FileRecord>;
    async fn list(&self) -> Result<Vec<FileRecord>>;
    /// Merges `changes` into the record's attributes and returns the result.
    async fn patch(&self, id: &str, changes: AttributeMap) -> Result<FileRecord>;
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Rules in the requested order; an unknown id is `Error::NotFound`.
    async fn get_rules(&self, ids: &[String]) -> Result<Vec<SortingRule>>;
    /// Active rules, optionally restricted to one owner.
    async fn active_rules(&self, owner: Option<&str>) -> Result<Vec<SortingRule>>;
}

#[async_trait]
pub trait ExecutionPersistence: Send + Sync {
    async fn append(&self, record: &ExecutionRecord) -> Result<()>;
    async fn update(&self, record: &ExecutionRecord) -> Result<()>;
    async fn load(&self, id: Uuid) -> Result<Option<ExecutionRecord>>;
    async fn list(&self, workflow_id: Option<Uuid>) -> Result<Vec<ExecutionRecord>>;
    /// Creation time of the most recent scheduled execution of a workflow.
    async fn last_run(&self, workflow_id: Uuid) -> Result<Option<DateTime<Utc>>>;
}
