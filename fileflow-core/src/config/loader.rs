use std::path::Path;

use crate::config::schema::{Config, StorageBackendKind};
use crate::error::{Error, Result};

pub const ENV_PREFIX: &str = "FILEFLOW_";

pub fn load_from_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        Error::Config(format!("failed to read config '{}': {err}", path.display()))
    })?;

    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or_default();

    if ext == "json" {
        serde_json::from_str(&content).map_err(|err| {
            Error::Config(format!(
                "failed to parse config '{}': {err}",
                path.display()
            ))
        })
    } else {
        toml::from_str(&content).map_err(|err| {
            Error::Config(format!(
                "failed to parse config '{}': {err}",
                path.display()
            ))
        })
    }
}

/// Applies `FILEFLOW_*` overrides on top of `config`.
pub fn load_from_env(mut config: Config) -> Result<Config> {
    apply_overrides(&mut config, |key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())?;
    Ok(config)
}

pub(crate) fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(level) = lookup("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(value) = lookup("LOG_JSON") {
        config.logging.json = parse_env("LOG_JSON", &value)?;
    }
    if let Some(value) = lookup("TICK_INTERVAL_MS") {
        config.scheduler.tick_interval_ms = parse_env("TICK_INTERVAL_MS", &value)?;
    }
    if let Some(value) = lookup("MISFIRE_GRACE_SECONDS") {
        config.scheduler.misfire_grace_seconds = parse_env("MISFIRE_GRACE_SECONDS", &value)?;
    }
    if let Some(value) = lookup("MAX_INSTANCES_PER_WORKFLOW") {
        config.scheduler.max_instances_per_workflow =
            parse_env("MAX_INSTANCES_PER_WORKFLOW", &value)?;
    }
    if let Some(value) = lookup("MAX_CONCURRENT_EXECUTIONS") {
        config.scheduler.max_concurrent_executions =
            parse_env("MAX_CONCURRENT_EXECUTIONS", &value)?;
    }
    if let Some(value) = lookup("MAX_QUEUED_EVENTS") {
        config.scheduler.max_queued_events = parse_env("MAX_QUEUED_EVENTS", &value)?;
    }
    if let Some(value) = lookup("ACTION_TIMEOUT_SECONDS") {
        config.execution.default_action_timeout_seconds =
            parse_env("ACTION_TIMEOUT_SECONDS", &value)?;
    }
    if let Some(value) = lookup("RETAINED_EXECUTIONS") {
        config.execution.retained_executions = parse_env("RETAINED_EXECUTIONS", &value)?;
    }
    if let Some(value) = lookup("STORAGE_BACKEND") {
        config.storage.backend = match value.trim().to_ascii_lowercase().as_str() {
            "memory" => StorageBackendKind::Memory,
            "sqlite" => StorageBackendKind::Sqlite,
            other => {
                return Err(Error::Config(format!(
                    "{ENV_PREFIX}STORAGE_BACKEND has unsupported value '{other}'"
                )))
            }
        };
    }
    if let Some(path) = lookup("SQLITE_PATH") {
        config.storage.sqlite_path = path;
    }
    Ok(())
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|err| {
        Error::Config(format!("{ENV_PREFIX}{key} has invalid value '{value}': {err}"))
    })
}

/// Loads the file when given (defaults otherwise), then environment overrides.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => load_from_file(path)?,
        None => Config::default(),
    };
    load_from_env(config)
}

#[cfg(test)]
mod tests {
    use super::{apply_overrides, load_from_file};
    use crate::config::schema::{Config, StorageBackendKind};
    use std::collections::HashMap;

    #[test]
    fn parses_partial_toml_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fileflow.toml");
        std::fs::write(
            &path,
            "[scheduler]\nmisfire_grace_seconds = 10\n\n[storage]\nbackend = \"sqlite\"\n",
        )
        .expect("write config");

        let config = load_from_file(&path).expect("config should parse");
        assert_eq!(config.scheduler.misfire_grace_seconds, 10);
        assert_eq!(config.scheduler.max_instances_per_workflow, 3);
        assert_eq!(config.storage.backend, StorageBackendKind::Sqlite);
    }

    #[test]
    fn parses_json_by_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fileflow.json");
        std::fs::write(&path, r#"{"logging": {"level": "debug"}}"#).expect("write config");

        let config = load_from_file(&path).expect("config should parse");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LOG_LEVEL", "trace"),
            ("MAX_INSTANCES_PER_WORKFLOW", "7"),
            ("STORAGE_BACKEND", "sqlite"),
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, |key| vars.get(key).map(|v| (*v).to_owned()))
            .expect("overrides apply");

        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.scheduler.max_instances_per_workflow, 7);
        assert_eq!(config.storage.backend, StorageBackendKind::Sqlite);
    }

    #[test]
    fn rejects_unparsable_env_value() {
        let mut config = Config::default();
        let error = apply_overrides(&mut config, |key| {
            (key == "TICK_INTERVAL_MS").then(|| "soon".to_owned())
        })
        .expect_err("bad number should fail");
        assert!(error.to_string().contains("TICK_INTERVAL_MS"));
    }
}
