use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use colloquy_chat::ChatError;
use colloquy_export::ExportError;
use colloquy_persist::PersistError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Authentication(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0}")]
    Resolution(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persist(PersistError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PersistError> for ApiError {
    fn from(error: PersistError) -> Self {
        match error {
            PersistError::ThreadNotFound(id) => ApiError::NotFound(format!("Thread not found: {}", id)),
            PersistError::ExtensionNotFound(id) => {
                ApiError::NotFound(format!("Extension not found: {}", id))
            }
            other => ApiError::Persist(other),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(error: ChatError) -> Self {
        match error {
            ChatError::ThreadNotFound(id) => ApiError::NotFound(format!("Thread not found: {}", id)),
            ChatError::Validation(msg) => ApiError::Validation(msg),
            ChatError::InvalidImage(msg) => ApiError::Validation(format!("Invalid image: {}", msg)),
            ChatError::Persist(e) => e.into(),
            ChatError::ImageStore(e) => ApiError::Internal(format!("Image store: {}", e)),
            ChatError::Upstream(e) => ApiError::Upstream(e),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(error: ExportError) -> Self {
        match error {
            ExportError::Resolution(_) => {
                ApiError::Resolution("Unable to resolve user partition for export.".to_string())
            }
            ExportError::Validation(msg) => ApiError::Validation(msg),
            ExportError::Persist(e) => e.into(),
            ExportError::Serialization(e) => ApiError::Internal(format!("Serialization: {}", e)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Authentication(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Validation(_) | ApiError::Resolution(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Persist(ref e) => {
                tracing::error!("Persistence error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ApiError::Upstream(ref e) => {
                tracing::error!("Upstream error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Processing error".to_string())
            }
            ApiError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
