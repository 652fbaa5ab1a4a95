use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("event log is corrupted: {0}")]
    Corruption(String),

    #[error("event log is unavailable: {0}")]
    Unavailable(String),
}
