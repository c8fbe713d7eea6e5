use fileflow_core::events::Event;
use fileflow_core::sorting::{Classification, SortSuggestion};
use fileflow_core::workflows::{ExecutionRecord, WorkflowDefinition};
use fileflow_core::FileRecord;
use serde::Serialize;

use crate::cli::OutputFormat;

pub struct Renderer {
    output_format: OutputFormat,
}

impl Renderer {
    pub fn new(output_format: OutputFormat) -> Self {
        Self { output_format }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn render_event(&self, event: &Event) {
        match self.output_format {
            OutputFormat::Text => self.render_event_text(event),
            OutputFormat::Json => self.render_event_json(event),
        }
    }

    fn render_event_text(&self, event: &Event) {
        match event {
            Event::ExecutionQueued {
                execution_id,
                workflow_id,
                trigger,
            } => println!(
                "[queued] execution {execution_id} of workflow {workflow_id} ({})",
                trigger.as_str()
            ),
            Event::ExecutionStarted { execution_id, .. } => {
                println!("[started] execution {execution_id}");
            }
            Event::StepFinished {
                execution_id,
                step_id,
                status,
            } => println!("[step] {execution_id} {step_id}: {}", status.as_str()),
            Event::ExecutionFinished {
                execution_id,
                status,
                ..
            } => println!("[finished] execution {execution_id}: {}", status.as_str()),
            Event::FiringDropped {
                workflow_id,
                trigger,
                reason,
                ..
            } => eprintln!(
                "[dropped] {} firing of workflow {workflow_id}: {reason}",
                trigger.as_str()
            ),
        }
    }

    fn render_event_json(&self, event: &Event) {
        let output = match event {
            Event::ExecutionQueued {
                execution_id,
                workflow_id,
                trigger,
            } => serde_json::json!({
                "type": "execution_queued",
                "execution_id": execution_id,
                "workflow_id": workflow_id,
                "trigger": trigger,
            }),
            Event::ExecutionStarted {
                execution_id,
                workflow_id,
            } => serde_json::json!({
                "type": "execution_started",
                "execution_id": execution_id,
                "workflow_id": workflow_id,
            }),
            Event::StepFinished {
                execution_id,
                step_id,
                status,
            } => serde_json::json!({
                "type": "step_finished",
                "execution_id": execution_id,
                "step_id": step_id,
                "status": status,
            }),
            Event::ExecutionFinished {
                execution_id,
                workflow_id,
                status,
            } => serde_json::json!({
                "type": "execution_finished",
                "execution_id": execution_id,
                "workflow_id": workflow_id,
                "status": status,
            }),
            Event::FiringDropped {
                workflow_id,
                trigger,
                nominal_time,
                reason,
            } => serde_json::json!({
                "type": "firing_dropped",
                "workflow_id": workflow_id,
                "trigger": trigger,
                "nominal_time": nominal_time,
                "reason": reason,
            }),
        };

        println!("{}", serde_json::to_string(&output).unwrap_or_default());
    }

    pub fn render_execution(&self, record: &ExecutionRecord) -> anyhow::Result<()> {
        if self.output_format == OutputFormat::Json {
            return print_json(record);
        }

        println!(
            "Execution {} of '{}' v{}: {}",
            record.id,
            record.workflow_name,
            record.workflow_version,
            record.status.as_str()
        );
        if let Some(runtime_ms) = record.runtime_ms {
            println!("  runtime: {runtime_ms}ms");
        }
        if let Some(error) = &record.error {
            println!("  error: {error}");
        }
        for step in &record.step_results {
            println!("  - step {} [{}]", step.step_id, step.status.as_str());
            if let Some(error) = &step.error {
                println!("      error: {error}");
            }
            for action in &step.actions {
                let detail = action
                    .error
                    .as_deref()
                    .or(action.reason.as_deref())
                    .map(|text| format!(": {text}"))
                    .unwrap_or_default();
                println!(
                    "      {} {}{detail}",
                    action.action_type,
                    action.status.as_str()
                );
            }
        }
        Ok(())
    }

    pub fn render_workflows(&self, workflows: &[std::sync::Arc<WorkflowDefinition>]) -> anyhow::Result<()> {
        if self.output_format == OutputFormat::Json {
            let definitions: Vec<&WorkflowDefinition> =
                workflows.iter().map(|workflow| workflow.as_ref()).collect();
            return print_json(&definitions);
        }

        if workflows.is_empty() {
            println!("No workflows loaded.");
            return Ok(());
        }
        println!("Workflows:");
        for workflow in workflows {
            println!(
                "- {} ({}, trigger={}, steps={}, active={})",
                workflow.name,
                workflow.id,
                workflow.trigger.kind().as_str(),
                workflow.steps.len(),
                workflow.is_active
            );
        }
        Ok(())
    }

    pub fn render_files(&self, files: &[FileRecord]) -> anyhow::Result<()> {
        if self.output_format == OutputFormat::Json {
            return print_json(&files);
        }
        for (position, file) in files.iter().enumerate() {
            println!("{:>3}. {} {}", position + 1, file.id, file.filename());
        }
        Ok(())
    }

    pub fn render_classifications(&self, classifications: &[Classification]) -> anyhow::Result<()> {
        if self.output_format == OutputFormat::Json {
            return print_json(&classifications);
        }
        for entry in classifications {
            match &entry.rule_id {
                Some(rule_id) => println!("{} -> {} (rule {rule_id})", entry.file_id, entry.category),
                None => println!("{} -> {}", entry.file_id, entry.category),
            }
        }
        Ok(())
    }

    pub fn render_suggestions(&self, suggestions: &[SortSuggestion]) -> anyhow::Result<()> {
        if self.output_format == OutputFormat::Json {
            return print_json(&suggestions);
        }
        for suggestion in suggestions {
            let criteria: Vec<String> = suggestion
                .criteria
                .iter()
                .map(|criterion| format!("{}:{}", criterion.field, criterion.direction.as_str()))
                .collect();
            println!("- {}: {}", suggestion.name, suggestion.description);
            println!("    {}", criteria.join(", "));
        }
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
