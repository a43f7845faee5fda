//! `OpenAPI` document and Swagger UI served under `/api/docs`.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::routes::{
    chat::{self, ChatRequest},
    documents::{self, DocumentResponse, ListDocumentsResponse, UploadDocumentRequest},
    export, extensions,
    extensions::{
        CreateExtensionRequest, ExtensionResponse, FunctionBody, HeaderBody, ListExtensionsResponse,
    },
    health::{self, HealthResponse},
    images,
    messages::{self, ListMessagesResponse, MessageResponse},
    threads::{self, CreateThreadRequest, ListThreadsResponse, ThreadResponse, UpdateThreadRequest},
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Colloquy API",
        description = "Chat with streaming answers, document retrieval, extensions and history export"
    ),
    paths(
        health::health_check,
        threads::create_thread,
        threads::list_threads,
        threads::get_thread,
        threads::update_thread,
        threads::delete_thread,
        threads::attach_extension,
        threads::detach_extension,
        messages::list_messages,
        documents::upload_document,
        documents::list_documents,
        extensions::create_extension,
        extensions::list_extensions,
        extensions::delete_extension,
        chat::chat,
        images::get_image,
        export::export_history,
    ),
    components(
        schemas(
            HealthResponse,
            CreateThreadRequest,
            UpdateThreadRequest,
            ThreadResponse,
            ListThreadsResponse,
            MessageResponse,
            ListMessagesResponse,
            UploadDocumentRequest,
            DocumentResponse,
            ListDocumentsResponse,
            CreateExtensionRequest,
            FunctionBody,
            HeaderBody,
            ExtensionResponse,
            ListExtensionsResponse,
            ChatRequest,
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "threads", description = "Conversation threads"),
        (name = "messages", description = "Thread history"),
        (name = "documents", description = "Documents for retrieval"),
        (name = "extensions", description = "User-defined HTTP functions"),
        (name = "chat", description = "Streaming chat turns"),
        (name = "images", description = "Stored chat images"),
        (name = "export", description = "History export for migration")
    )
)]
pub struct ApiDoc;

pub fn routes<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
}
