//! Action dispatch: a table from [`ActionType`] to handler.
//!
//! Handlers validate their params when a workflow is created and execute
//! against a mutable [`ActionContext`] when a step runs. Custom action types
//! can be registered at runtime; a type with no handler is reported as a
//! skipped action, never an error.

pub mod builtin;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::runtime::Collaborators;
use crate::sorting::engine::SortingEngine;
use crate::storage::model::{AttributeMap, FileRecord};
use crate::workflows::types::{Action, ActionType};

/// Mutable state threaded through every action of one execution.
pub struct ActionContext {
    pub execution_id: Uuid,
    pub workflow_id: Uuid,
    pub workflow_name: String,
    pub step_id: String,
    /// Working file list; reordered in place by `sort_files`.
    pub files: Vec<FileRecord>,
    /// Trigger payload plus execution metadata; step conditions read this.
    pub context: AttributeMap,
    pub collaborators: Collaborators,
    pub sorting: SortingEngine,
    /// Time budget of the action currently running.
    pub timeout: Duration,
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn validate(&self, _params: &Value) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, ctx: &mut ActionContext, params: &Value) -> Result<Value>;
}

#[derive(Default)]
pub struct ActionRegistry {
    handlers: RwLock<HashMap<ActionType, Arc<dyn ActionHandler>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_handlers() -> Self {
        let registry = Self::new();
        builtin::register_builtin_handlers(&registry);
        registry
    }

    /// Adds or replaces the handler for `action_type`.
    pub fn register(&self, action_type: ActionType, handler: Arc<dyn ActionHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(action_type, handler);
    }

    pub fn get(&self, action_type: &ActionType) -> Option<Arc<dyn ActionHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(action_type)
            .cloned()
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(|action_type| action_type.as_str().to_owned())
            .collect();
        names.sort();
        names
    }

    pub fn validate(&self, action: &Action) -> Result<()> {
        if !action.params.is_object() {
            return Err(Error::Validation(format!(
                "action '{}' params must be an object",
                action.action_type
            )));
        }
        for key in ["timeout_seconds", "timeout_ms"] {
            if let Some(timeout) = action.params.get(key) {
                if timeout.as_u64().map_or(true, |value| value == 0) {
                    return Err(Error::Validation(format!(
                        "action '{}' {key} must be a positive integer",
                        action.action_type
                    )));
                }
            }
        }

        match self.get(&action.action_type) {
            Some(handler) => handler.validate(&action.params).map_err(|err| match err {
                Error::Validation(message) => Error::Validation(format!(
                    "action '{}': {message}",
                    action.action_type
                )),
                other => other,
            }),
            None if action.action_type.as_str().trim().is_empty() => Err(Error::Validation(
                "action type cannot be empty".to_owned(),
            )),
            None => {
                tracing::warn!(
                    action_type = %action.action_type,
                    "no handler registered for action type; it will be skipped at runtime"
                );
                Ok(())
            }
        }
    }
}

pub(crate) fn parse_params<T: DeserializeOwned>(action: &str, params: &Value) -> Result<T> {
    serde_json::from_value(params.clone())
        .map_err(|err| Error::Validation(format!("invalid params for {action}: {err}")))
}
