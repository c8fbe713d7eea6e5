mod cli;
mod renderer;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use fileflow_core::rules::SortingRule;
use fileflow_core::sorting::{suggest_sort_criteria, SortingEngine};
use fileflow_core::storage::memory::{MemoryFileStore, MemoryRuleStore};
use fileflow_core::workflows::{
    ExecutionStatus, TriggerContext, WorkflowDefinition, WorkflowLoader,
};
use fileflow_core::{Collaborators, Config, FileRecord, WorkflowEngine};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::cli::{Command, DataArgs, OutputFormat};
use crate::renderer::Renderer;

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    if let Err(error) = run() {
        eprintln!("fileflow failed: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse_args();
    let config = fileflow_core::config::load(args.config.as_deref())
        .context("failed to load config")?;
    fileflow_core::config::validate_config(&config)?;
    fileflow_core::logging::init_tracing(&config.logging);

    let renderer = Renderer::new(args.output);
    let work_dir = args.work_dir;

    match args.command {
        Command::Suggest { category } => renderer.render_suggestions(&suggest_sort_criteria(&category)),
        Command::Classify { data } => {
            let (files, rules) = load_data(&config, &work_dir, &data)?;
            renderer.render_classifications(&SortingEngine::new().classify(&files, &rules))
        }
        Command::Sort {
            data,
            criteria,
            category,
        } => {
            let (files, rules) = load_data(&config, &work_dir, &data)?;
            let sorting = SortingEngine::new();
            let sorted = match category {
                Some(category) => sorting.sort_by_category(files, &category, &rules),
                None => {
                    let ordered = sorting.apply_sorting_rules(files, &rules);
                    sorting.sort_files(ordered, &criteria)
                }
            };
            renderer.render_files(&sorted)
        }
        other => {
            let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
            runtime.block_on(run_engine_command(config, &work_dir, &renderer, other))
        }
    }
}

async fn run_engine_command(
    config: Config,
    work_dir: &Path,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Validate { data } => {
            let (_, summary) = build_engine(config, work_dir, &data).await?;
            match renderer.output_format() {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text => println!(
                    "Config is valid: {} workflows, {} sorting rules, {} files.",
                    summary["workflows"].as_array().map_or(0, Vec::len),
                    summary["rules"],
                    summary["files"]
                ),
            }
            Ok(())
        }
        Command::Workflows => {
            let (engine, _) = build_engine(config, work_dir, &DataArgs::default()).await?;
            renderer.render_workflows(&engine.list_workflows().await)
        }
        Command::Run {
            workflow,
            data,
            payload,
            file_ids,
        } => {
            let (engine, _) = build_engine(config, work_dir, &data).await?;
            let definition = resolve_workflow(&engine, &workflow).await?;
            let mut trigger = TriggerContext::manual().with_payload(parse_payload(payload.as_deref())?);
            if !file_ids.is_empty() {
                trigger = trigger.with_files(file_ids);
            }

            let record = engine.execute_workflow(definition.id, trigger).await?;
            renderer.render_execution(&record)?;
            if record.status == ExecutionStatus::Failed {
                bail!("execution {} failed", record.id);
            }
            Ok(())
        }
        Command::Emit {
            event_type,
            data,
            payload,
        } => {
            let (engine, _) = build_engine(config, work_dir, &data).await?;
            let payload = parse_payload(payload.as_deref())?;
            let started = engine.trigger_event(&event_type, payload).await?;
            if started.is_empty() && renderer.output_format() == OutputFormat::Text {
                println!("No workflows subscribed to '{event_type}'.");
            }
            for execution_id in started {
                let record = wait_for_terminal(&engine, execution_id).await?;
                renderer.render_execution(&record)?;
            }
            Ok(())
        }
        Command::Serve { data } => {
            let (engine, _) = build_engine(config, work_dir, &data).await?;
            let mut events = engine.subscribe();
            engine.start().await;
            tracing::info!(workflows = engine.list_workflows().await.len(), "serving; press Ctrl-C to stop");

            loop {
                tokio::select! {
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("failed to listen for Ctrl-C")?;
                        break;
                    }
                    event = events.recv() => match event {
                        Ok(event) => renderer.render_event(&event),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event output lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }

            engine.stop();
            Ok(())
        }
        Command::Suggest { .. } | Command::Classify { .. } | Command::Sort { .. } => {
            bail!("command does not need the workflow engine")
        }
    }
}

/// Engine with the configured collaborators, the given files and rules in
/// memory, and every workflow found in the configured directories.
async fn build_engine(
    config: Config,
    work_dir: &Path,
    data: &DataArgs,
) -> anyhow::Result<(WorkflowEngine, Value)> {
    let (files, rules) = load_data(&config, work_dir, data)?;
    let mut summary = serde_json::json!({
        "files": files.len(),
        "rules": rules.len(),
    });

    let drafts = WorkflowLoader::load_drafts(&config.workflows, work_dir)?;
    let collaborators = Collaborators::from_config(&config)?
        .with_files(Arc::new(MemoryFileStore::new(files)))
        .with_rules(Arc::new(MemoryRuleStore::new(rules)));
    let engine = WorkflowEngine::new(config, collaborators)?;

    let mut workflows = Vec::with_capacity(drafts.len());
    for loaded in drafts {
        let id = engine
            .create_workflow(loaded.draft)
            .await
            .with_context(|| format!("invalid workflow '{}'", loaded.path.display()))?;
        workflows.push(id.to_string());
    }

    summary["workflows"] = serde_json::json!(workflows);
    Ok((engine, summary))
}

fn load_data(
    config: &Config,
    work_dir: &Path,
    data: &DataArgs,
) -> anyhow::Result<(Vec<FileRecord>, Vec<SortingRule>)> {
    let files_path = data_path(data.files.as_ref(), config.workflows.files_file.as_deref(), work_dir);
    let rules_path = data_path(data.rules.as_ref(), config.workflows.rules_file.as_deref(), work_dir);

    let files = match files_path {
        Some(path) => WorkflowLoader::load_files(&path)?,
        None => Vec::new(),
    };
    let rules = match rules_path {
        Some(path) => WorkflowLoader::load_rules(&path)?,
        None => Vec::new(),
    };
    Ok((files, rules))
}

fn data_path(explicit: Option<&PathBuf>, configured: Option<&str>, work_dir: &Path) -> Option<PathBuf> {
    explicit
        .cloned()
        .or_else(|| configured.map(|raw| WorkflowLoader::resolve_path(raw, work_dir)))
}

async fn resolve_workflow(
    engine: &WorkflowEngine,
    reference: &str,
) -> anyhow::Result<Arc<WorkflowDefinition>> {
    let workflow = match Uuid::parse_str(reference) {
        Ok(id) => engine.get_workflow(id).await?,
        Err(_) => engine.find_workflow(reference).await?,
    };
    Ok(workflow)
}

fn parse_payload(raw: Option<&str>) -> anyhow::Result<Value> {
    match raw {
        Some(raw) => serde_json::from_str(raw).context("--payload must be valid JSON"),
        None => Ok(Value::Null),
    }
}

async fn wait_for_terminal(
    engine: &WorkflowEngine,
    execution_id: Uuid,
) -> anyhow::Result<fileflow_core::ExecutionRecord> {
    loop {
        let record = engine.get_execution_status(execution_id).await?;
        if record.is_terminal() {
            return Ok(record);
        }
        tokio::time::sleep(STATUS_POLL_INTERVAL).await;
    }
}
