use crate::config::schema::{Config, StorageBackendKind};
use crate::error::{Error, Result};

pub fn validate_config(config: &Config) -> Result<()> {
    if config.logging.level.trim().is_empty() {
        return Err(Error::Validation(
            "logging.level cannot be empty".to_owned(),
        ));
    }

    if config.scheduler.tick_interval_ms == 0 {
        return Err(Error::Validation(
            "scheduler.tick_interval_ms must be greater than 0".to_owned(),
        ));
    }

    if config.scheduler.max_instances_per_workflow == 0 {
        return Err(Error::Validation(
            "scheduler.max_instances_per_workflow must be greater than 0".to_owned(),
        ));
    }

    if config.scheduler.max_concurrent_executions == 0 {
        return Err(Error::Validation(
            "scheduler.max_concurrent_executions must be greater than 0".to_owned(),
        ));
    }

    if config.scheduler.max_instances_per_workflow > config.scheduler.max_concurrent_executions {
        return Err(Error::Validation(format!(
            "scheduler.max_instances_per_workflow {} exceeds scheduler.max_concurrent_executions {}",
            config.scheduler.max_instances_per_workflow,
            config.scheduler.max_concurrent_executions
        )));
    }

    if config.scheduler.max_queued_events == 0 {
        return Err(Error::Validation(
            "scheduler.max_queued_events must be greater than 0".to_owned(),
        ));
    }

    if config.execution.default_action_timeout_seconds == 0 {
        return Err(Error::Validation(
            "execution.default_action_timeout_seconds must be greater than 0".to_owned(),
        ));
    }

    if config.execution.event_bus_capacity == 0 {
        return Err(Error::Validation(
            "execution.event_bus_capacity must be greater than 0".to_owned(),
        ));
    }

    if config.storage.backend == StorageBackendKind::Sqlite {
        if config.storage.sqlite_path.trim().is_empty() {
            return Err(Error::Validation(
                "storage.sqlite_path is required for the sqlite backend".to_owned(),
            ));
        }
        if config.storage.pool_size == 0 {
            return Err(Error::Validation(
                "storage.pool_size must be greater than 0".to_owned(),
            ));
        }
    }

    Ok(())
}
