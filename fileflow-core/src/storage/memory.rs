//! In-process implementations of every collaborator. Used by tests and by
//! the CLI, which loads records from disk into them.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::rules::types::SortingRule;
use crate::storage::model::{AttributeMap, FileRecord};
use crate::storage::{ExecutionPersistence, FileStore, RuleStore};
use crate::tools::types::{Notification, NotificationSink, Report, ReportSink};
use crate::workflows::tracker::ExecutionRecord;
use crate::workflows::trigger::TriggerKind;

#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: RwLock<Vec<FileRecord>>,
}

impl MemoryFileStore {
    pub fn new(files: Vec<FileRecord>) -> Self {
        Self {
            files: RwLock::new(files),
        }
    }

    pub async fn insert(&self, file: FileRecord) {
        let mut files = self.files.write().await;
        match files.iter_mut().find(|existing| existing.id == file.id) {
            Some(existing) => *existing = file,
            None => files.push(file),
        }
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn get(&self, id: &str) -> Result<FileRecord> {
        self.files
            .read()
            .await
            .iter()
            .find(|file| file.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("file '{id}'")))
    }

    async fn list(&self) -> Result<Vec<FileRecord>> {
        Ok(self.files.read().await.clone())
    }

    async fn patch(&self, id: &str, changes: AttributeMap) -> Result<FileRecord> {
        let mut files = self.files.write().await;
        let file = files
            .iter_mut()
            .find(|file| file.id == id)
            .ok_or_else(|| Error::NotFound(format!("file '{id}'")))?;
        file.attributes.extend(changes);
        Ok(file.clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: RwLock<Vec<SortingRule>>,
}

impl MemoryRuleStore {
    pub fn new(rules: Vec<SortingRule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    pub async fn insert(&self, rule: SortingRule) {
        let mut rules = self.rules.write().await;
        match rules.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn get_rules(&self, ids: &[String]) -> Result<Vec<SortingRule>> {
        let rules = self.rules.read().await;
        ids.iter()
            .map(|id| {
                rules
                    .iter()
                    .find(|rule| &rule.id == id)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(format!("sorting rule '{id}'")))
            })
            .collect()
    }

    async fn active_rules(&self, owner: Option<&str>) -> Result<Vec<SortingRule>> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .filter(|rule| rule.is_active)
            .filter(|rule| owner.is_none() || rule.owner.as_deref() == owner)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryExecutionStore {
    records: RwLock<HashMap<Uuid, ExecutionRecord>>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionPersistence for MemoryExecutionStore {
    async fn append(&self, record: &ExecutionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(Error::Storage(format!(
                "execution {} is already persisted",
                record.id
            )));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn update(&self, record: &ExecutionRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&record.id)
            .ok_or_else(|| Error::NotFound(format!("execution {}", record.id)))?;
        *stored = record.clone();
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<ExecutionRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self, workflow_id: Option<Uuid>) -> Result<Vec<ExecutionRecord>> {
        let mut records: Vec<ExecutionRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|record| workflow_id.map_or(true, |id| record.workflow_id == id))
            .cloned()
            .collect();
        records.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(records)
    }

    async fn last_run(&self, workflow_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| {
                record.workflow_id == workflow_id && record.trigger == TriggerKind::Scheduled
            })
            .map(|record| record.created_at)
            .max())
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct MemoryNotificationSink {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for MemoryNotificationSink {
    fn notify(&self, notification: Notification) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[derive(Debug, Default)]
pub struct MemoryReportSink {
    reports: RwLock<Vec<Report>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reports(&self) -> Vec<Report> {
        self.reports.read().await.clone()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn persist(&self, report: Report) -> Result<String> {
        let id = report.id.clone();
        self.reports.write().await.push(report);
        Ok(id)
    }
}
