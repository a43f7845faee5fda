use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::models::{Document, DocumentChunk, Extension, Message, Thread};
use crate::trait_client::PersistenceClient;

#[derive(Default)]
struct Tables {
    threads: Vec<Thread>,
    messages: Vec<Message>,
    documents: Vec<Document>,
    chunks: Vec<DocumentChunk>,
    extensions: Vec<Extension>,
}

/// Process-local store, used for development and tests
#[derive(Default)]
pub struct InMemoryPersistence {
    tables: RwLock<Tables>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_by_created<T>(items: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| key(item));
}

#[async_trait]
impl PersistenceClient for InMemoryPersistence {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_thread(&self, thread: Thread) -> Result<Thread> {
        self.tables.write().await.threads.push(thread.clone());
        Ok(thread)
    }

    async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<Thread>> {
        let tables = self.tables.read().await;
        Ok(tables
            .threads
            .iter()
            .find(|t| t.id == thread_id && t.user_id == user_id && !t.is_deleted)
            .cloned())
    }

    async fn list_threads(&self, user_id: &str) -> Result<Vec<Thread>> {
        let tables = self.tables.read().await;
        let mut threads: Vec<Thread> = tables
            .threads
            .iter()
            .filter(|t| t.user_id == user_id && !t.is_deleted)
            .cloned()
            .collect();
        threads.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(threads)
    }

    async fn update_thread(&self, thread: &Thread) -> Result<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .threads
            .iter_mut()
            .find(|t| t.id == thread.id && t.user_id == thread.user_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread.id.clone()))?;
        *stored = thread.clone();
        Ok(())
    }

    async fn touch_thread(&self, user_id: &str, thread_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(thread) = tables
            .threads
            .iter_mut()
            .find(|t| t.id == thread_id && t.user_id == user_id)
        {
            thread.last_message_at = at;
        }
        Ok(())
    }

    async fn soft_delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let owned = |uid: &str, tid: &str| uid == user_id && tid == thread_id;

        tables
            .threads
            .iter_mut()
            .filter(|t| owned(&t.user_id, &t.id))
            .for_each(|t| t.is_deleted = true);
        tables
            .messages
            .iter_mut()
            .filter(|m| owned(&m.user_id, &m.thread_id))
            .for_each(|m| m.is_deleted = true);
        tables
            .documents
            .iter_mut()
            .filter(|d| owned(&d.user_id, &d.thread_id))
            .for_each(|d| d.is_deleted = true);
        tables
            .chunks
            .iter_mut()
            .filter(|c| owned(&c.user_id, &c.thread_id))
            .for_each(|c| c.is_deleted = true);
        Ok(())
    }

    async fn save_message(&self, message: Message) -> Result<()> {
        self.tables.write().await.messages.push(message);
        Ok(())
    }

    async fn get_messages(&self, user_id: &str, thread_id: &str) -> Result<Vec<Message>> {
        let tables = self.tables.read().await;
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.user_id == user_id && m.thread_id == thread_id && !m.is_deleted)
            .cloned()
            .collect();
        sort_by_created(&mut messages, |m| m.created_at);
        Ok(messages)
    }

    async fn get_recent_messages(
        &self,
        user_id: &str,
        thread_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let mut messages = self.get_messages(user_id, thread_id).await?;
        messages.reverse();
        messages.truncate(limit);
        Ok(messages)
    }

    async fn list_user_messages(&self, user_id: &str) -> Result<Vec<Message>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.user_id == user_id && !m.is_deleted)
            .cloned()
            .collect())
    }

    async fn save_document(&self, document: Document) -> Result<()> {
        self.tables.write().await.documents.push(document);
        Ok(())
    }

    async fn save_document_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<()> {
        self.tables.write().await.chunks.extend(chunks);
        Ok(())
    }

    async fn list_documents(&self, user_id: &str, thread_id: &str) -> Result<Vec<Document>> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .iter()
            .filter(|d| d.user_id == user_id && d.thread_id == thread_id && !d.is_deleted)
            .cloned()
            .collect())
    }

    async fn get_document_chunks(&self, user_id: &str, thread_id: &str) -> Result<Vec<DocumentChunk>> {
        let tables = self.tables.read().await;
        Ok(tables
            .chunks
            .iter()
            .filter(|c| c.user_id == user_id && c.thread_id == thread_id && !c.is_deleted)
            .cloned()
            .collect())
    }

    async fn list_user_documents(&self, user_id: &str) -> Result<Vec<Document>> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .iter()
            .filter(|d| d.user_id == user_id && !d.is_deleted)
            .cloned()
            .collect())
    }

    async fn save_extension(&self, extension: Extension) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.extensions.retain(|e| e.id != extension.id);
        tables.extensions.push(extension);
        Ok(())
    }

    async fn get_extension(&self, user_id: &str, extension_id: &str) -> Result<Option<Extension>> {
        let tables = self.tables.read().await;
        Ok(tables
            .extensions
            .iter()
            .find(|e| e.id == extension_id && e.is_visible_to(user_id))
            .cloned())
    }

    async fn list_extensions(&self, user_id: &str) -> Result<Vec<Extension>> {
        let tables = self.tables.read().await;
        let mut extensions: Vec<Extension> = tables
            .extensions
            .iter()
            .filter(|e| e.is_visible_to(user_id))
            .cloned()
            .collect();
        extensions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(extensions)
    }

    async fn delete_extension(&self, user_id: &str, extension_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let before = tables.extensions.len();
        tables
            .extensions
            .retain(|e| !(e.id == extension_id && e.user_id == user_id));
        if tables.extensions.len() == before {
            return Err(PersistError::ExtensionNotFound(extension_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;
    use chrono::Duration;

    #[tokio::test]
    async fn test_recent_messages_newest_first() {
        let store = InMemoryPersistence::new();
        let base = Utc::now();
        for i in 0..5 {
            let mut msg = Message::new("t1", "u1", MessageRole::User, format!("m{}", i));
            msg.created_at = base + Duration::seconds(i);
            store.save_message(msg).await.unwrap();
        }

        let recent = store.get_recent_messages("u1", "t1", 2).await.unwrap();
        let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m4", "m3"]);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_thread_and_children() {
        let store = InMemoryPersistence::new();
        let thread = store.create_thread(Thread::new("u1", "Ada")).await.unwrap();
        store
            .save_message(Message::new(&thread.id, "u1", MessageRole::User, "hi"))
            .await
            .unwrap();
        store
            .save_document(Document::new(&thread.id, "u1", "notes.txt"))
            .await
            .unwrap();

        store.soft_delete_thread("u1", &thread.id).await.unwrap();

        assert!(store.get_thread("u1", &thread.id).await.unwrap().is_none());
        assert!(store.get_messages("u1", &thread.id).await.unwrap().is_empty());
        assert!(store.list_user_documents("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_threads_are_partitioned_by_user() {
        let store = InMemoryPersistence::new();
        let thread = store.create_thread(Thread::new("u1", "Ada")).await.unwrap();
        assert!(store.get_thread("u2", &thread.id).await.unwrap().is_none());
        assert!(store.list_threads("u2").await.unwrap().is_empty());
    }
}
