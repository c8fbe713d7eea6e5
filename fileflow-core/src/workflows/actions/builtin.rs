use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::sorting::suggestions::detect_category;
use crate::sorting::types::SortCriterion;
use crate::storage::model::AttributeMap;
use crate::tools::types::{Notification, Report, ScriptInvocation};
use crate::workflows::actions::{parse_params, ActionContext, ActionHandler, ActionRegistry};
use crate::workflows::types::ActionType;

pub fn register_builtin_handlers(registry: &ActionRegistry) {
    registry.register(ActionType::SortFiles, Arc::new(SortFilesAction));
    registry.register(ActionType::MoveFiles, Arc::new(MoveFilesAction));
    registry.register(ActionType::ProcessFiles, Arc::new(ProcessFilesAction));
    registry.register(ActionType::SendNotification, Arc::new(SendNotificationAction));
    registry.register(ActionType::CreateReport, Arc::new(CreateReportAction));
    registry.register(ActionType::RunScript, Arc::new(RunScriptAction));
}

#[derive(Debug, Deserialize)]
struct SortFilesParams {
    #[serde(default)]
    rule_ids: Vec<String>,
    #[serde(default)]
    criteria: Vec<SortCriterion>,
}

/// Applies stored sorting rules, then an optional multi-criterion pass, to
/// the working file list.
pub struct SortFilesAction;

#[async_trait]
impl ActionHandler for SortFilesAction {
    fn validate(&self, params: &Value) -> Result<()> {
        let params: SortFilesParams = parse_params("sort_files", params)?;
        if params.rule_ids.is_empty() && params.criteria.is_empty() {
            return Err(Error::Validation(
                "sort_files requires rule_ids or criteria".to_owned(),
            ));
        }
        if params.rule_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(Error::Validation(
                "sort_files rule_ids cannot contain empty ids".to_owned(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &mut ActionContext, params: &Value) -> Result<Value> {
        let params: SortFilesParams = parse_params("sort_files", params)?;
        let rules = if params.rule_ids.is_empty() {
            Vec::new()
        } else {
            ctx.collaborators.rules.get_rules(&params.rule_ids).await?
        };

        let files = std::mem::take(&mut ctx.files);
        let sorted = ctx.sorting.apply_sorting_rules(files, &rules);
        let sorted = ctx.sorting.sort_files(sorted, &params.criteria);

        let categories: BTreeMap<String, String> = ctx
            .sorting
            .classify(&sorted, &rules)
            .into_iter()
            .map(|classification| (classification.file_id, classification.category))
            .collect();
        let order: Vec<&str> = sorted.iter().map(|file| file.id.as_str()).collect();
        let output = json!({
            "sorted_count": sorted.len(),
            "rules_applied": rules.iter().filter(|rule| rule.is_active).count(),
            "order": order,
            "categories": categories,
        });

        ctx.files = sorted;
        Ok(output)
    }
}

#[derive(Debug, Deserialize)]
struct MoveFilesParams {
    destination: String,
}

/// Records a new `location` for every working file.
pub struct MoveFilesAction;

#[async_trait]
impl ActionHandler for MoveFilesAction {
    fn validate(&self, params: &Value) -> Result<()> {
        let params: MoveFilesParams = parse_params("move_files", params)?;
        if params.destination.trim().is_empty() {
            return Err(Error::Validation(
                "move_files destination cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &mut ActionContext, params: &Value) -> Result<Value> {
        let params: MoveFilesParams = parse_params("move_files", params)?;
        let mut changes = AttributeMap::new();
        changes.insert("location".to_owned(), json!(params.destination));

        let mut moved = 0usize;
        for file in ctx.files.iter_mut() {
            *file = ctx
                .collaborators
                .files
                .patch(&file.id, changes.clone())
                .await?;
            moved += 1;
        }

        Ok(json!({ "moved": moved, "destination": params.destination }))
    }
}

#[derive(Debug, Deserialize)]
struct ProcessFilesParams {
    #[serde(default)]
    operations: Vec<String>,
}

/// Queues the working files for downstream processing.
pub struct ProcessFilesAction;

#[async_trait]
impl ActionHandler for ProcessFilesAction {
    fn validate(&self, params: &Value) -> Result<()> {
        parse_params::<ProcessFilesParams>("process_files", params).map(|_| ())
    }

    async fn execute(&self, ctx: &mut ActionContext, params: &Value) -> Result<Value> {
        let params: ProcessFilesParams = parse_params("process_files", params)?;
        let mut changes = AttributeMap::new();
        changes.insert("processing_status".to_owned(), json!("queued"));
        changes.insert("pending_operations".to_owned(), json!(params.operations));

        for file in ctx.files.iter_mut() {
            *file = ctx
                .collaborators
                .files
                .patch(&file.id, changes.clone())
                .await?;
        }

        Ok(json!({
            "processed_count": ctx.files.len(),
            "operations": params.operations,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct SendNotificationParams {
    message: String,
    #[serde(default = "default_channel")]
    channel: String,
    #[serde(default)]
    recipients: Vec<String>,
}

fn default_channel() -> String {
    "default".to_owned()
}

pub struct SendNotificationAction;

#[async_trait]
impl ActionHandler for SendNotificationAction {
    fn validate(&self, params: &Value) -> Result<()> {
        let params: SendNotificationParams = parse_params("send_notification", params)?;
        if params.message.trim().is_empty() {
            return Err(Error::Validation(
                "send_notification message cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &mut ActionContext, params: &Value) -> Result<Value> {
        let params: SendNotificationParams = parse_params("send_notification", params)?;
        ctx.collaborators.notifications.notify(Notification {
            channel: params.channel.clone(),
            message: params.message,
            recipients: params.recipients,
            workflow_id: ctx.workflow_id,
            execution_id: ctx.execution_id,
        });
        Ok(json!({ "notification_sent": true, "channel": params.channel }))
    }
}

#[derive(Debug, Deserialize)]
struct CreateReportParams {
    name: String,
    #[serde(default)]
    include_files: bool,
}

/// Summarizes the execution so far and hands it to the report sink.
pub struct CreateReportAction;

#[async_trait]
impl ActionHandler for CreateReportAction {
    fn validate(&self, params: &Value) -> Result<()> {
        let params: CreateReportParams = parse_params("create_report", params)?;
        if params.name.trim().is_empty() {
            return Err(Error::Validation(
                "create_report name cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &mut ActionContext, params: &Value) -> Result<Value> {
        let params: CreateReportParams = parse_params("create_report", params)?;
        let mut body = json!({
            "workflow": { "id": ctx.workflow_id, "name": ctx.workflow_name },
            "execution_id": ctx.execution_id,
            "step_id": ctx.step_id,
            "file_count": ctx.files.len(),
            "context": ctx.context,
        });
        if params.include_files {
            let files: Vec<Value> = ctx
                .files
                .iter()
                .map(|file| {
                    json!({
                        "id": file.id,
                        "filename": file.filename(),
                        "category": detect_category(file),
                        "location": file.attributes.get("location"),
                    })
                })
                .collect();
            body["files"] = Value::Array(files);
        }

        let report = Report {
            id: Uuid::new_v4().to_string(),
            name: params.name,
            workflow_id: ctx.workflow_id,
            execution_id: ctx.execution_id,
            created_at: Utc::now(),
            body,
        };
        let report_id = ctx.collaborators.reports.persist(report).await?;
        Ok(json!({ "report_id": report_id }))
    }
}

#[derive(Debug, Deserialize)]
struct RunScriptParams {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    working_dir: Option<String>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

/// Runs a script through the script runner. A non-zero exit code fails the
/// action.
pub struct RunScriptAction;

#[async_trait]
impl ActionHandler for RunScriptAction {
    fn validate(&self, params: &Value) -> Result<()> {
        let params: RunScriptParams = parse_params("run_script", params)?;
        if params.command.trim().is_empty() {
            return Err(Error::Validation(
                "run_script command cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &mut ActionContext, params: &Value) -> Result<Value> {
        let params: RunScriptParams = parse_params("run_script", params)?;
        let timeout = params
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(ctx.timeout);

        let mut invocation = ScriptInvocation::new(params.command.clone(), timeout);
        invocation.args = params.args;
        invocation.env = params.env;
        invocation.env.insert(
            "FILEFLOW_EXECUTION_ID".to_owned(),
            ctx.execution_id.to_string(),
        );
        invocation
            .env
            .insert("FILEFLOW_WORKFLOW_ID".to_owned(), ctx.workflow_id.to_string());
        invocation.working_dir = params.working_dir.map(Into::into);

        let output = ctx.collaborators.scripts.run(invocation).await?;
        if output.exit_code != 0 {
            return Err(Error::Action(format!(
                "script '{}' exited with code {}: {}",
                params.command,
                output.exit_code,
                output.stderr.trim()
            )));
        }

        Ok(json!({
            "exit_code": output.exit_code,
            "stdout": output.stdout,
            "stderr": output.stderr,
        }))
    }
}
