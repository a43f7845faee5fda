use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use colloquy_persist::Message;

use crate::{auth::CurrentUser, error::ApiResult, routes::threads::load_thread, state::AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    pub thread_id: String,
    /// system, user, assistant, function or tool
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multimodal_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListMessagesResponse {
    pub messages: Vec<MessageResponse>,
}

/// List messages in a thread, oldest first
#[utoipa::path(
    get,
    path = "/api/threads/{thread_id}/messages",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "List of messages", body = ListMessagesResponse),
        (status = 404, description = "Thread not found")
    ),
    tag = "messages"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ListMessagesResponse>> {
    load_thread(&state, &user, &thread_id).await?;

    let messages = state.persistence.get_messages(&user.id, &thread_id).await?;

    Ok(Json(ListMessagesResponse {
        messages: messages.into_iter().map(message_to_response).collect(),
    }))
}

fn message_to_response(message: Message) -> MessageResponse {
    MessageResponse {
        id: message.id,
        thread_id: message.thread_id,
        role: message.role.to_string(),
        content: message.content,
        name: message.name,
        multimodal_image: message.multimodal_image,
        created_at: message.created_at,
    }
}
