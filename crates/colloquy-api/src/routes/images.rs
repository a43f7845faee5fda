use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImageQuery {
    /// Thread ID
    pub t: Option<String>,
    /// Image file name
    pub img: Option<String>,
}

/// Serve an image stored for a thread
///
/// Image links are embedded in chat history, so this route takes no identity.
#[utoipa::path(
    get,
    path = "/api/images",
    params(ImageQuery),
    responses(
        (status = 200, description = "PNG image", content_type = "image/png"),
        (status = 404, description = "Image not found", content_type = "text/plain")
    ),
    tag = "images"
)]
pub async fn get_image(State(state): State<Arc<AppState>>, Query(query): Query<ImageQuery>) -> Response {
    let (Some(thread_id), Some(file_name)) = (query.t, query.img) else {
        return not_found("Missing thread id or image name in the URL.");
    };

    match state.images.load(&thread_id, &file_name).await {
        Ok(Some(bytes)) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Ok(None) => not_found("Image not found."),
        Err(e) => {
            tracing::debug!(thread_id = %thread_id, image = %file_name, "Image lookup failed: {}", e);
            not_found("Image not found.")
        }
    }
}

fn not_found(message: &'static str) -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message,
    )
        .into_response()
}
