use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization failure: {0}")]
    Serialization(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}
