use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use colloquy_persist::Thread;

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateThreadRequest {
    pub name: Option<String>,
    pub persona_message: Option<String>,
    pub persona_title: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateThreadRequest {
    pub name: Option<String>,
    pub bookmarked: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThreadResponse {
    pub id: String,
    pub name: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub persona_message: String,
    pub persona_title: String,
    pub extensions: Vec<String>,
    pub bookmarked: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListThreadsResponse {
    pub threads: Vec<ThreadResponse>,
}

/// Create a new thread
#[utoipa::path(
    post,
    path = "/api/threads",
    request_body = CreateThreadRequest,
    responses(
        (status = 201, description = "Thread created", body = ThreadResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "threads"
)]
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<CreateThreadRequest>,
) -> ApiResult<(StatusCode, Json<ThreadResponse>)> {
    let mut thread = Thread::new(&user.id, &user.name);
    if let Some(name) = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        thread.name = name;
    }
    thread.persona_message = req.persona_message.unwrap_or_default();
    thread.persona_title = req.persona_title.unwrap_or_default();
    thread.extensions = req.extensions;

    let thread = state.persistence.create_thread(thread).await?;
    tracing::info!(thread_id = %thread.id, "Thread created");

    Ok((StatusCode::CREATED, Json(thread_to_response(thread))))
}

/// List the caller's threads, most recent activity first
#[utoipa::path(
    get,
    path = "/api/threads",
    responses(
        (status = 200, description = "List of threads", body = ListThreadsResponse)
    ),
    tag = "threads"
)]
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<ListThreadsResponse>> {
    let threads = state.persistence.list_threads(&user.id).await?;

    Ok(Json(ListThreadsResponse {
        threads: threads.into_iter().map(thread_to_response).collect(),
    }))
}

/// Get a specific thread by ID
#[utoipa::path(
    get,
    path = "/api/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Thread details", body = ThreadResponse),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadResponse>> {
    let thread = load_thread(&state, &user, &thread_id).await?;
    Ok(Json(thread_to_response(thread)))
}

/// Rename or bookmark a thread
#[utoipa::path(
    patch,
    path = "/api/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = UpdateThreadRequest,
    responses(
        (status = 200, description = "Thread updated", body = ThreadResponse),
        (status = 400, description = "Empty name"),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn update_thread(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(thread_id): Path<String>,
    Json(req): Json<UpdateThreadRequest>,
) -> ApiResult<Json<ThreadResponse>> {
    let mut thread = load_thread(&state, &user, &thread_id).await?;

    if let Some(name) = req.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("Thread name must not be empty".to_string()));
        }
        thread.name = name.to_string();
    }
    if let Some(bookmarked) = req.bookmarked {
        thread.bookmarked = bookmarked;
    }

    state.persistence.update_thread(&thread).await?;
    Ok(Json(thread_to_response(thread)))
}

/// Soft-delete a thread with its messages and documents
#[utoipa::path(
    delete,
    path = "/api/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 204, description = "Thread deleted"),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    load_thread(&state, &user, &thread_id).await?;
    state.persistence.soft_delete_thread(&user.id, &thread_id).await?;
    tracing::info!(thread_id = %thread_id, "Thread deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Attach an extension to a thread
#[utoipa::path(
    put,
    path = "/api/threads/{thread_id}/extensions/{extension_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID"),
        ("extension_id" = String, Path, description = "Extension ID")
    ),
    responses(
        (status = 200, description = "Extension attached", body = ThreadResponse),
        (status = 404, description = "Thread or extension not found")
    ),
    tag = "threads"
)]
pub async fn attach_extension(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((thread_id, extension_id)): Path<(String, String)>,
) -> ApiResult<Json<ThreadResponse>> {
    let mut thread = load_thread(&state, &user, &thread_id).await?;
    state
        .persistence
        .get_extension(&user.id, &extension_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Extension not found: {}", extension_id)))?;

    if !thread.extensions.contains(&extension_id) {
        thread.extensions.push(extension_id);
        state.persistence.update_thread(&thread).await?;
    }

    Ok(Json(thread_to_response(thread)))
}

/// Detach an extension from a thread
#[utoipa::path(
    delete,
    path = "/api/threads/{thread_id}/extensions/{extension_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID"),
        ("extension_id" = String, Path, description = "Extension ID")
    ),
    responses(
        (status = 200, description = "Extension detached", body = ThreadResponse),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn detach_extension(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((thread_id, extension_id)): Path<(String, String)>,
) -> ApiResult<Json<ThreadResponse>> {
    let mut thread = load_thread(&state, &user, &thread_id).await?;

    let before = thread.extensions.len();
    thread.extensions.retain(|id| id != &extension_id);
    if thread.extensions.len() != before {
        state.persistence.update_thread(&thread).await?;
    }

    Ok(Json(thread_to_response(thread)))
}

/// Thread owned by the caller, or 404
pub(crate) async fn load_thread(
    state: &AppState,
    user: &CurrentUser,
    thread_id: &str,
) -> ApiResult<Thread> {
    state
        .persistence
        .get_thread(&user.id, thread_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Thread not found: {}", thread_id)))
}

fn thread_to_response(thread: Thread) -> ThreadResponse {
    ThreadResponse {
        id: thread.id,
        name: thread.name,
        user_name: thread.user_name,
        created_at: thread.created_at,
        last_message_at: thread.last_message_at,
        persona_message: thread.persona_message,
        persona_title: thread.persona_title,
        extensions: thread.extensions,
        bookmarked: thread.bookmarked,
    }
}
