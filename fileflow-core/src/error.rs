use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Raised while evaluating a single condition. The evaluator turns this into
    /// a non-match; it never reaches an engine caller.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error("action error: {0}")]
    Action(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "storage-sqlite")]
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
