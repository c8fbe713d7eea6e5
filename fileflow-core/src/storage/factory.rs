use std::sync::Arc;

use crate::config::schema::{Config, StorageBackendKind};
use crate::error::Result;
use crate::storage::memory::MemoryExecutionStore;
use crate::storage::ExecutionPersistence;

pub fn create_execution_persistence(config: &Config) -> Result<Arc<dyn ExecutionPersistence>> {
    match config.storage.backend {
        StorageBackendKind::Memory => Ok(Arc::new(MemoryExecutionStore::new())),
        #[cfg(feature = "storage-sqlite")]
        StorageBackendKind::Sqlite => {
            let connection_string = format!(
                "{}{}",
                config.storage.connection_string_prefix, config.storage.sqlite_path
            );
            let backend = crate::storage::sqlite::SqliteExecutionStore::new(
                &connection_string,
                config.storage.pool_size,
            )?;
            Ok(Arc::new(backend))
        }
        #[cfg(not(feature = "storage-sqlite"))]
        StorageBackendKind::Sqlite => Err(crate::error::Error::Config(
            "storage backend 'sqlite' requires the 'storage-sqlite' feature".to_owned(),
        )),
    }
}
