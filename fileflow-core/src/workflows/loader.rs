use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::schema::WorkflowsConfig;
use crate::error::{Error, Result};
use crate::rules::types::SortingRule;
use crate::storage::model::FileRecord;
use crate::workflows::types::WorkflowDraft;

/// A workflow draft together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedDraft {
    pub path: PathBuf,
    pub draft: WorkflowDraft,
}

/// Reads workflow drafts, sorting rules and file records from YAML or JSON.
/// Parsing only; drafts are validated when they are registered.
pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn resolve_path(raw: &str, base: &Path) -> PathBuf {
        if let Some(rest) = raw.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }

    fn discover_files(config: &WorkflowsConfig, base: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for dir in &config.directories {
            let root = Self::resolve_path(dir, base);
            if !root.is_dir() {
                tracing::debug!(dir = %root.display(), "workflow directory not found; skipping");
                continue;
            }

            let mut queue = VecDeque::new();
            queue.push_back((root, 0usize));
            while let Some((current, depth)) = queue.pop_front() {
                let entries = match std::fs::read_dir(&current) {
                    Ok(entries) => entries,
                    Err(err) => {
                        tracing::warn!(dir = %current.display(), error = %err, "cannot read workflow directory");
                        continue;
                    }
                };
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        if depth < config.max_discovery_depth {
                            queue.push_back((path, depth + 1));
                        }
                        continue;
                    }
                    if path.is_file() && is_definition_file(&path) {
                        files.push(path);
                    }
                }
            }
        }
        files.sort();
        files
    }

    fn parse_value(path: &Path, raw: &str) -> Result<serde_json::Value> {
        let ext = path
            .extension()
            .and_then(|value| value.to_str())
            .unwrap_or_default();

        if matches!(ext, "yaml" | "yml") {
            serde_yaml::from_str::<serde_json::Value>(raw).map_err(|err| {
                Error::Config(format!("failed parsing yaml '{}': {err}", path.display()))
            })
        } else {
            serde_json::from_str::<serde_json::Value>(raw).map_err(|err| {
                Error::Config(format!("failed parsing json '{}': {err}", path.display()))
            })
        }
    }

    fn parse_file<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            Error::Config(format!(
                "failed reading {what} file '{}': {err}",
                path.display()
            ))
        })?;
        let value = Self::parse_value(path, &raw)?;
        serde_json::from_value::<T>(value).map_err(|err| {
            Error::Config(format!(
                "failed parsing {what} '{}': {err}",
                path.display()
            ))
        })
    }

    pub fn parse_draft(path: &Path) -> Result<WorkflowDraft> {
        Self::parse_file(path, "workflow definition")
    }

    /// Id for a workflow loaded without one. Derived from the name so the
    /// same definition keeps its execution history across restarts.
    pub fn stable_id(name: &str) -> Uuid {
        let key = format!("fileflow://workflows/{}", name.trim());
        Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes())
    }

    pub fn load_drafts(config: &WorkflowsConfig, work_dir: &Path) -> Result<Vec<LoadedDraft>> {
        let mut drafts = Vec::new();
        for path in Self::discover_files(config, work_dir) {
            let mut draft = Self::parse_draft(&path)?;
            if draft.id.is_none() {
                draft.id = Some(Self::stable_id(&draft.name));
            }
            tracing::debug!(path = %path.display(), workflow = %draft.name, "loaded workflow draft");
            drafts.push(LoadedDraft { path, draft });
        }
        Ok(drafts)
    }

    /// Sorting rules from a YAML or JSON list. Each rule is validated.
    pub fn load_rules(path: &Path) -> Result<Vec<SortingRule>> {
        let rules: Vec<SortingRule> = Self::parse_file(path, "sorting rules")?;
        for rule in &rules {
            rule.validate().map_err(|err| {
                Error::Validation(format!("{}: {err}", path.display()))
            })?;
        }
        Ok(rules)
    }

    /// File records from a YAML or JSON list.
    pub fn load_files(path: &Path) -> Result<Vec<FileRecord>> {
        let files: Vec<FileRecord> = Self::parse_file(path, "file records")?;
        if let Some(file) = files.iter().find(|file| file.id.trim().is_empty()) {
            return Err(Error::Validation(format!(
                "{}: file record with filename '{}' has an empty id",
                path.display(),
                file.filename()
            )));
        }
        Ok(files)
    }
}

fn is_definition_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|value| value.to_str()),
        Some("json" | "yaml" | "yml")
    )
}
