use colloquy_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Storage error: {0}")]
    Persist(#[from] PersistError),

    #[error("Image store error: {0}")]
    ImageStore(#[from] std::io::Error),

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
