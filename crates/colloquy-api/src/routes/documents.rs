use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use colloquy_persist::Document;

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    routes::threads::load_thread,
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadDocumentRequest {
    pub name: String,
    /// Extracted plain text of the document
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: String,
    pub thread_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListDocumentsResponse {
    pub documents: Vec<DocumentResponse>,
}

/// Upload a text document for retrieval within the thread
#[utoipa::path(
    post,
    path = "/api/threads/{thread_id}/documents",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = UploadDocumentRequest,
    responses(
        (status = 201, description = "Document stored and indexed", body = DocumentResponse),
        (status = 400, description = "Empty name or content"),
        (status = 404, description = "Thread not found")
    ),
    tag = "documents"
)]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(thread_id): Path<String>,
    Json(req): Json<UploadDocumentRequest>,
) -> ApiResult<(StatusCode, Json<DocumentResponse>)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Document name must not be empty".to_string()));
    }
    load_thread(&state, &user, &thread_id).await?;

    let document = state
        .retriever
        .upload(&user.id, &thread_id, name, &req.content)
        .await?;
    tracing::info!(thread_id = %thread_id, document_id = %document.id, "Document uploaded");

    Ok((StatusCode::CREATED, Json(document_to_response(document))))
}

/// List documents attached to a thread
#[utoipa::path(
    get,
    path = "/api/threads/{thread_id}/documents",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "List of documents", body = ListDocumentsResponse),
        (status = 404, description = "Thread not found")
    ),
    tag = "documents"
)]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ListDocumentsResponse>> {
    load_thread(&state, &user, &thread_id).await?;
    let documents = state.persistence.list_documents(&user.id, &thread_id).await?;

    Ok(Json(ListDocumentsResponse {
        documents: documents.into_iter().map(document_to_response).collect(),
    }))
}

fn document_to_response(document: Document) -> DocumentResponse {
    DocumentResponse {
        id: document.id,
        thread_id: document.thread_id,
        name: document.name,
        created_at: document.created_at,
    }
}
