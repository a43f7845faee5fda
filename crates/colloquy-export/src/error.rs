use colloquy_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    /// No partition key could be derived from the request
    #[error("Unable to resolve user partition: {0}")]
    Resolution(String),

    #[error("Invalid export request: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Persist(#[from] PersistError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
