use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::rules::condition::{validate_conditions, Condition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Manual,
    #[serde(alias = "schedule", alias = "cron")]
    Scheduled,
    Event,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Event => "event",
        }
    }
}

/// What starts a workflow. Stored on each workflow version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerSpec {
    #[default]
    Manual,
    #[serde(alias = "schedule", alias = "cron")]
    Scheduled { cron_expression: String },
    Event {
        event_type: String,
        #[serde(default)]
        event_filter: Vec<Condition>,
    },
}

impl TriggerSpec {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::Manual => TriggerKind::Manual,
            Self::Scheduled { .. } => TriggerKind::Scheduled,
            Self::Event { .. } => TriggerKind::Event,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Manual => Ok(()),
            Self::Scheduled { cron_expression } => parse_cron(cron_expression).map(|_| ()),
            Self::Event {
                event_type,
                event_filter,
            } => {
                if event_type.trim().is_empty() {
                    return Err(Error::Validation(
                        "event trigger requires a non-empty event_type".to_owned(),
                    ));
                }
                validate_conditions(event_filter, "event filter")
            }
        }
    }
}

/// Parses a cron expression. Five-field crontab syntax gets a leading
/// seconds field of `0`.
pub fn parse_cron(expression: &str) -> Result<cron::Schedule> {
    let trimmed = expression.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_owned()
    };
    cron::Schedule::from_str(&normalized).map_err(|err| {
        Error::Validation(format!("invalid cron expression '{expression}': {err}"))
    })
}

/// Operator-facing trigger registration payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRegistration {
    pub workflow_id: Uuid,
    pub trigger_type: TriggerKind,
    #[serde(default)]
    pub trigger_config: TriggerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    #[serde(default)]
    pub cron_expression: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub event_filter: Option<Vec<Condition>>,
}

impl TriggerRegistration {
    pub fn into_spec(self) -> Result<TriggerSpec> {
        let config = self.trigger_config;
        let spec = match self.trigger_type {
            TriggerKind::Manual => TriggerSpec::Manual,
            TriggerKind::Scheduled => TriggerSpec::Scheduled {
                cron_expression: config.cron_expression.ok_or_else(|| {
                    Error::Validation(
                        "scheduled trigger requires triggerConfig.cronExpression".to_owned(),
                    )
                })?,
            },
            TriggerKind::Event => TriggerSpec::Event {
                event_type: config.event_type.ok_or_else(|| {
                    Error::Validation("event trigger requires triggerConfig.eventType".to_owned())
                })?,
                event_filter: config.event_filter.unwrap_or_default(),
            },
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Why an execution was started, plus its input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerContext {
    pub kind: TriggerKind,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub payload: Value,
    /// Files to operate on; `None` means every file in the store.
    #[serde(default)]
    pub file_ids: Option<Vec<String>>,
}

impl TriggerContext {
    pub fn manual() -> Self {
        Self {
            kind: TriggerKind::Manual,
            event_type: None,
            payload: Value::Null,
            file_ids: None,
        }
    }

    pub fn scheduled(payload: Value) -> Self {
        Self {
            kind: TriggerKind::Scheduled,
            event_type: None,
            payload,
            file_ids: None,
        }
    }

    pub fn event(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: TriggerKind::Event,
            event_type: Some(event_type.into()),
            payload,
            file_ids: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_files<I, S>(mut self, file_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_ids = Some(file_ids.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for TriggerContext {
    fn default() -> Self {
        Self::manual()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_cron, TriggerKind, TriggerRegistration, TriggerSpec};

    #[test]
    fn accepts_five_and_six_field_cron() {
        assert!(parse_cron("*/5 * * * *").is_ok());
        assert!(parse_cron("0 */5 * * * *").is_ok());
        let err = parse_cron("every tuesday").expect_err("garbage should fail");
        assert!(err.to_string().contains("invalid cron expression"));
    }

    #[test]
    fn registration_payload_becomes_trigger_spec() {
        let registration: TriggerRegistration = serde_json::from_value(json!({
            "workflowId": "6f1c1f5e-8f43-4a43-9d51-0d5d8b1f7a10",
            "triggerType": "event",
            "triggerConfig": {
                "eventType": "file_uploaded",
                "eventFilter": [{ "field": "extension", "operator": "equals", "value": "pdf" }]
            }
        }))
        .expect("registration should parse");
        assert_eq!(registration.trigger_type, TriggerKind::Event);

        let spec = registration.into_spec().expect("valid registration");
        match spec {
            TriggerSpec::Event {
                event_type,
                event_filter,
            } => {
                assert_eq!(event_type, "file_uploaded");
                assert_eq!(event_filter.len(), 1);
            }
            other => panic!("unexpected trigger {other:?}"),
        }
    }

    #[test]
    fn scheduled_registration_requires_valid_cron() {
        let registration: TriggerRegistration = serde_json::from_value(json!({
            "workflowId": "6f1c1f5e-8f43-4a43-9d51-0d5d8b1f7a10",
            "triggerType": "scheduled",
            "triggerConfig": { "cronExpression": "61 * * * *" }
        }))
        .expect("registration should parse");
        assert!(registration.into_spec().is_err());
    }

    #[test]
    fn trigger_spec_is_tagged_by_type() {
        let spec: TriggerSpec = serde_json::from_value(json!({
            "type": "scheduled",
            "cron_expression": "0 3 * * *"
        }))
        .expect("trigger should parse");
        assert_eq!(spec.kind(), TriggerKind::Scheduled);
        assert!(spec.validate().is_ok());
    }
}
