//! HTTP surface of Colloquy.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::routes::{chat, documents, export, extensions, health, images, messages, threads};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Threads
        .route("/threads", post(threads::create_thread).get(threads::list_threads))
        .route(
            "/threads/:thread_id",
            get(threads::get_thread)
                .patch(threads::update_thread)
                .delete(threads::delete_thread),
        )
        .route(
            "/threads/:thread_id/extensions/:extension_id",
            put(threads::attach_extension).delete(threads::detach_extension),
        )
        // Messages & documents
        .route("/threads/:thread_id/messages", get(messages::list_messages))
        .route(
            "/threads/:thread_id/documents",
            post(documents::upload_document).get(documents::list_documents),
        )
        // Extensions
        .route(
            "/extensions",
            post(extensions::create_extension).get(extensions::list_extensions),
        )
        .route("/extensions/:extension_id", axum::routing::delete(extensions::delete_extension))
        // Chat
        .route("/chat", post(chat::chat))
        .route("/images", get(images::get_image))
        .route("/export", get(export::export_history));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .merge(openapi::routes())
        .layer(axum_middleware::from_fn(middleware::logging::log_request))
        .layer(TimeoutLayer::new(Duration::from_secs(state.config.server.request_timeout_secs)))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if !config.cors.enabled {
        return CorsLayer::permissive();
    }

    let mut cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    if config.cors.origins.iter().any(|o| o == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .cors
            .origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    cors
}
