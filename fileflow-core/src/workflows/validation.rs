use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::rules::condition::validate_conditions;
use crate::workflows::actions::ActionRegistry;
use crate::workflows::types::WorkflowDraft;

/// Checks a draft before it becomes a workflow version: name, step ids,
/// condition shapes, action params and the trigger.
pub fn validate_draft(draft: &WorkflowDraft, actions: &ActionRegistry) -> Result<()> {
    if draft.name.trim().is_empty() {
        return Err(Error::Validation(
            "workflow name cannot be empty".to_owned(),
        ));
    }

    draft.trigger.validate().map_err(|err| {
        Error::Validation(format!("workflow '{}' trigger: {}", draft.name, strip(err)))
    })?;

    let mut step_ids = HashSet::new();
    for step in &draft.steps {
        if step.id.trim().is_empty() {
            return Err(Error::Validation(format!(
                "workflow '{}' has a step with an empty id",
                draft.name
            )));
        }
        if !step_ids.insert(step.id.as_str()) {
            return Err(Error::Validation(format!(
                "workflow '{}' has duplicate step id '{}'",
                draft.name, step.id
            )));
        }

        validate_conditions(&step.conditions, &format!("step '{}'", step.id))?;
        for action in &step.actions {
            actions.validate(action).map_err(|err| {
                Error::Validation(format!("step '{}': {}", step.id, strip(err)))
            })?;
        }
    }

    Ok(())
}

fn strip(err: Error) -> String {
    match err {
        Error::Validation(message) => message,
        other => other.to_string(),
    }
}
