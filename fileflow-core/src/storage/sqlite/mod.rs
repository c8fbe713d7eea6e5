mod backend;

pub use backend::SqliteExecutionStore;
