use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use colloquy_chat::{spawn_relay, ModelType, UserPrompt};

use crate::{auth::CurrentUser, error::ApiResult, state::AppState};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Thread the turn belongs to
    #[serde(alias = "id", alias = "thread_id")]
    pub thread_id: String,
    pub message: String,
    /// Image attachment as a `data:` URL
    #[serde(default, alias = "multimodalImage")]
    pub image: Option<String>,
    /// `standard` (default) or `reasoning`
    #[serde(default, alias = "model_type")]
    #[schema(value_type = Option<String>)]
    pub model_type: ModelType,
}

impl From<ChatRequest> for UserPrompt {
    fn from(req: ChatRequest) -> Self {
        UserPrompt {
            thread_id: req.thread_id,
            message: req.message,
            image: req.image,
            model_type: req.model_type,
        }
    }
}

/// Run a chat turn and stream the answer as Server-Sent Events
///
/// Events: `content`, `functionCall`, `functionCallResult`, `finalContent`,
/// `abort` and `error`, each carrying `{"type": ..., "response": ...}`.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Streaming response", content_type = "text/event-stream"),
        (status = 400, description = "Invalid message or image"),
        (status = 404, description = "Thread not found")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<ChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let turn = state.dispatcher.dispatch(&user.chat_user(), req.into()).await?;
    tracing::info!(
        thread_id = %turn.thread.id,
        strategy = turn.strategy.as_str(),
        "Chat turn started"
    );

    let cancel = CancellationToken::new();
    let mut events = spawn_relay(turn.fragments, turn.context, cancel.clone());

    // Dropping the response stream (client gone) cancels the relay
    let guard = cancel.drop_guard();
    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = events.recv().await {
            yield Event::default().event(event.name()).json_data(&event);
        }
    };

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    ))
}
