use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, Utc};
use mongodb::Client;

use crate::dbs::mongo::models::{MongoDocument, MongoDocumentChunk, MongoExtension, MongoMessage, MongoThread};
use crate::dbs::mongo::repositories::{
    MongoDocumentRepository, MongoExtensionRepository, MongoMessageRepository, MongoThreadRepository,
};
use crate::error::{PersistError, Result};
use crate::models::{Document, DocumentChunk, Extension, Message, Thread};
use crate::trait_client::PersistenceClient;

pub struct MongoPersistenceClient {
    client: Client,
    database: String,
    thread_repo: MongoThreadRepository,
    message_repo: MongoMessageRepository,
    document_repo: MongoDocumentRepository,
    extension_repo: MongoExtensionRepository,
}

impl MongoPersistenceClient {
    /// Connect to MongoDB and create client
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        tracing::info!(database = %database, "Connected to MongoDB");

        Ok(Self {
            thread_repo: MongoThreadRepository::new(&client, database),
            message_repo: MongoMessageRepository::new(&client, database),
            document_repo: MongoDocumentRepository::new(&client, database),
            extension_repo: MongoExtensionRepository::new(&client, database),
            database: database.to_string(),
            client,
        })
    }
}

#[async_trait]
impl PersistenceClient for MongoPersistenceClient {
    async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    async fn create_thread(&self, thread: Thread) -> Result<Thread> {
        let mongo_thread: MongoThread = thread.into();
        self.thread_repo.insert(&mongo_thread).await?;
        Ok(mongo_thread.into())
    }

    async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<Thread>> {
        let thread = self.thread_repo.find(user_id, thread_id).await?;
        Ok(thread.map(Into::into))
    }

    async fn list_threads(&self, user_id: &str) -> Result<Vec<Thread>> {
        let threads = self.thread_repo.list(user_id).await?;
        Ok(threads.into_iter().map(Into::into).collect())
    }

    async fn update_thread(&self, thread: &Thread) -> Result<()> {
        let mongo_thread: MongoThread = thread.clone().into();
        self.thread_repo.replace(&mongo_thread).await
    }

    async fn touch_thread(&self, user_id: &str, thread_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.thread_repo.touch(user_id, thread_id, at).await
    }

    async fn soft_delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()> {
        self.thread_repo.soft_delete(user_id, thread_id).await?;
        self.message_repo.soft_delete_thread(user_id, thread_id).await?;
        self.document_repo.soft_delete_thread(user_id, thread_id).await?;
        Ok(())
    }

    async fn save_message(&self, message: Message) -> Result<()> {
        let mongo_message: MongoMessage = message.into();
        self.message_repo.insert(&mongo_message).await
    }

    async fn get_messages(&self, user_id: &str, thread_id: &str) -> Result<Vec<Message>> {
        let messages = self.message_repo.list_for_thread(user_id, thread_id).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn get_recent_messages(
        &self,
        user_id: &str,
        thread_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let messages = self.message_repo.recent(user_id, thread_id, limit).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn list_user_messages(&self, user_id: &str) -> Result<Vec<Message>> {
        let messages = self.message_repo.list_for_user(user_id).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn save_document(&self, document: Document) -> Result<()> {
        let mongo_document: MongoDocument = document.into();
        self.document_repo.insert(&mongo_document).await
    }

    async fn save_document_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<()> {
        let mongo_chunks: Vec<MongoDocumentChunk> = chunks.into_iter().map(Into::into).collect();
        self.document_repo.insert_chunks(&mongo_chunks).await
    }

    async fn list_documents(&self, user_id: &str, thread_id: &str) -> Result<Vec<Document>> {
        let documents = self.document_repo.list_for_thread(user_id, thread_id).await?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn get_document_chunks(&self, user_id: &str, thread_id: &str) -> Result<Vec<DocumentChunk>> {
        let chunks = self.document_repo.chunks_for_thread(user_id, thread_id).await?;
        Ok(chunks.into_iter().map(Into::into).collect())
    }

    async fn list_user_documents(&self, user_id: &str) -> Result<Vec<Document>> {
        let documents = self.document_repo.list_for_user(user_id).await?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_extension(&self, extension: Extension) -> Result<()> {
        let mongo_extension: MongoExtension = extension.into();
        self.extension_repo.upsert(&mongo_extension).await
    }

    async fn get_extension(&self, user_id: &str, extension_id: &str) -> Result<Option<Extension>> {
        let extension = self.extension_repo.find_visible(user_id, extension_id).await?;
        Ok(extension.map(Into::into))
    }

    async fn list_extensions(&self, user_id: &str) -> Result<Vec<Extension>> {
        let extensions = self.extension_repo.list_visible(user_id).await?;
        Ok(extensions.into_iter().map(Into::into).collect())
    }

    async fn delete_extension(&self, user_id: &str, extension_id: &str) -> Result<()> {
        self.extension_repo.delete(user_id, extension_id).await
    }
}
