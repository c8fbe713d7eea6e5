use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use super::trigger::TriggerSpec;
use super::types::{WorkflowDefinition, WorkflowDraft};

/// Every version of every workflow. Versions are immutable; running
/// executions hold the `Arc` of the version they started with.
#[derive(Default, Clone)]
pub struct WorkflowRegistry {
    workflows: HashMap<Uuid, Vec<Arc<WorkflowDefinition>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, draft: WorkflowDraft) -> Result<Arc<WorkflowDefinition>> {
        let id = draft.id.unwrap_or_else(Uuid::new_v4);
        if self.workflows.contains_key(&id) {
            return Err(Error::Validation(format!("workflow {id} already exists")));
        }
        let definition = Arc::new(WorkflowDefinition::from_draft(id, 1, draft));
        self.workflows.insert(id, vec![definition.clone()]);
        Ok(definition)
    }

    /// Stores `draft` as the next version of `id`.
    pub fn update(&mut self, id: Uuid, draft: WorkflowDraft) -> Result<Arc<WorkflowDefinition>> {
        let versions = self
            .workflows
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("workflow {id}")))?;
        let next_version = versions.last().map_or(1, |current| current.version + 1);
        let definition = Arc::new(WorkflowDefinition::from_draft(id, next_version, draft));
        versions.push(definition.clone());
        Ok(definition)
    }

    pub fn current(&self, id: Uuid) -> Option<Arc<WorkflowDefinition>> {
        self.workflows
            .get(&id)
            .and_then(|versions| versions.last())
            .cloned()
    }

    pub fn version(&self, id: Uuid, version: u32) -> Option<Arc<WorkflowDefinition>> {
        self.workflows
            .get(&id)?
            .iter()
            .find(|definition| definition.version == version)
            .cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<WorkflowDefinition>> {
        self.list().into_iter().find(|definition| definition.name == name)
    }

    /// Current versions sorted by name.
    pub fn list(&self) -> Vec<Arc<WorkflowDefinition>> {
        let mut current: Vec<Arc<WorkflowDefinition>> = self
            .workflows
            .values()
            .filter_map(|versions| versions.last().cloned())
            .collect();
        current.sort_by(|left, right| left.name.cmp(&right.name).then(left.id.cmp(&right.id)));
        current
    }

    pub fn scheduled(&self) -> Vec<Arc<WorkflowDefinition>> {
        self.list()
            .into_iter()
            .filter(|definition| {
                definition.is_active && matches!(definition.trigger, TriggerSpec::Scheduled { .. })
            })
            .collect()
    }

    pub fn subscribers(&self, event_type: &str) -> Vec<Arc<WorkflowDefinition>> {
        self.list()
            .into_iter()
            .filter(|definition| {
                definition.is_active
                    && matches!(
                        &definition.trigger,
                        TriggerSpec::Event { event_type: subscribed, .. } if subscribed == event_type
                    )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::WorkflowRegistry;
    use crate::workflows::trigger::TriggerSpec;
    use crate::workflows::types::WorkflowDraft;

    #[test]
    fn updates_create_new_versions_and_keep_old_ones() {
        let mut registry = WorkflowRegistry::new();
        let first = registry
            .register(WorkflowDraft::new("tidy"))
            .expect("register");
        let mut draft = first.to_draft();
        draft.description = "now with notes".to_owned();
        let second = registry.update(first.id, draft).expect("update");

        assert_eq!(second.version, 2);
        assert_eq!(registry.current(first.id), Some(second.clone()));
        assert_eq!(
            registry.version(first.id, 1).map(|definition| definition.description.clone()),
            Some(String::new())
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut registry = WorkflowRegistry::new();
        let first = registry
            .register(WorkflowDraft::new("a"))
            .expect("register");
        let mut duplicate = WorkflowDraft::new("b");
        duplicate.id = Some(first.id);
        assert!(registry.register(duplicate).is_err());
    }

    #[test]
    fn finds_event_subscribers() {
        let mut registry = WorkflowRegistry::new();
        registry
            .register(WorkflowDraft::new("on-upload").with_trigger(TriggerSpec::Event {
                event_type: "file_uploaded".to_owned(),
                event_filter: Vec::new(),
            }))
            .expect("register");
        let mut inactive = WorkflowDraft::new("disabled").with_trigger(TriggerSpec::Event {
            event_type: "file_uploaded".to_owned(),
            event_filter: Vec::new(),
        });
        inactive.is_active = false;
        registry.register(inactive).expect("register");

        let subscribers = registry.subscribers("file_uploaded");
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0].name, "on-upload");
        assert!(registry.subscribers("file_deleted").is_empty());
    }
}
