use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("record store error: {0}")]
    Record(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("malformed record: {0}")]
    Serde(#[from] serde_json::Error),
}
