use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Document, DocumentChunk, Extension, Message, Thread};

/// Storage operations for chat history
///
/// Every lookup is scoped by `user_id`, the partition key. Soft-deleted
/// records are never returned.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Cheap round-trip used by health checks
    async fn ping(&self) -> Result<()>;

    // ---- threads ----

    async fn create_thread(&self, thread: Thread) -> Result<Thread>;

    async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<Thread>>;

    /// Threads of a user, most recent activity first
    async fn list_threads(&self, user_id: &str) -> Result<Vec<Thread>>;

    /// Replace the stored thread record
    async fn update_thread(&self, thread: &Thread) -> Result<()>;

    async fn touch_thread(&self, user_id: &str, thread_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Flag the thread, its messages, documents and chunks as deleted
    async fn soft_delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()>;

    // ---- messages ----

    async fn save_message(&self, message: Message) -> Result<()>;

    /// Messages of a thread in creation order
    async fn get_messages(&self, user_id: &str, thread_id: &str) -> Result<Vec<Message>>;

    /// The `limit` newest messages of a thread, newest first
    async fn get_recent_messages(
        &self,
        user_id: &str,
        thread_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>>;

    /// Every message stored under a partition key
    async fn list_user_messages(&self, user_id: &str) -> Result<Vec<Message>>;

    // ---- documents ----

    async fn save_document(&self, document: Document) -> Result<()>;

    async fn save_document_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<()>;

    async fn list_documents(&self, user_id: &str, thread_id: &str) -> Result<Vec<Document>>;

    async fn get_document_chunks(&self, user_id: &str, thread_id: &str) -> Result<Vec<DocumentChunk>>;

    /// Every document stored under a partition key
    async fn list_user_documents(&self, user_id: &str) -> Result<Vec<Document>>;

    // ---- extensions ----

    async fn save_extension(&self, extension: Extension) -> Result<()>;

    /// Extension by id, if owned by or published to `user_id`
    async fn get_extension(&self, user_id: &str, extension_id: &str) -> Result<Option<Extension>>;

    /// Extensions owned by the user plus every published one
    async fn list_extensions(&self, user_id: &str) -> Result<Vec<Extension>>;

    async fn delete_extension(&self, user_id: &str, extension_id: &str) -> Result<()>;
}
