use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Document, DocumentChunk, Extension, ExtensionFunction, ExtensionHeader, Message, MessageRole,
    Thread,
};

/// MongoDB thread document; timestamps stored as BSON dates for range queries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoThread {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub name: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub last_message_at: DateTime<Utc>,
    #[serde(default)]
    pub persona_message: String,
    #[serde(default)]
    pub persona_title: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub bookmarked: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub thread_id: String,
    pub user_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multimodal_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub thread_id: String,
    pub user_id: String,
    pub name: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoDocumentChunk {
    #[serde(rename = "_id")]
    pub id: String,
    pub document_id: String,
    pub thread_id: String,
    pub user_id: String,
    pub name: String,
    pub chunk_index: u32,
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoExtension {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub execution_steps: String,
    #[serde(default)]
    pub functions: Vec<ExtensionFunction>,
    #[serde(default)]
    pub headers: Vec<ExtensionHeader>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

// Conversions between database-agnostic and MongoDB-specific models

impl From<Thread> for MongoThread {
    fn from(t: Thread) -> Self {
        Self {
            id: t.id,
            user_id: t.user_id,
            user_name: t.user_name,
            name: t.name,
            created_at: t.created_at,
            last_message_at: t.last_message_at,
            persona_message: t.persona_message,
            persona_title: t.persona_title,
            extensions: t.extensions,
            bookmarked: t.bookmarked,
            is_deleted: t.is_deleted,
        }
    }
}

impl From<MongoThread> for Thread {
    fn from(t: MongoThread) -> Self {
        Self {
            id: t.id,
            user_id: t.user_id,
            user_name: t.user_name,
            name: t.name,
            created_at: t.created_at,
            last_message_at: t.last_message_at,
            persona_message: t.persona_message,
            persona_title: t.persona_title,
            extensions: t.extensions,
            bookmarked: t.bookmarked,
            is_deleted: t.is_deleted,
        }
    }
}

impl From<Message> for MongoMessage {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            thread_id: m.thread_id,
            user_id: m.user_id,
            role: m.role,
            content: m.content,
            name: m.name,
            multimodal_image: m.multimodal_image,
            model_type: m.model_type,
            created_at: m.created_at,
            is_deleted: m.is_deleted,
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(m: MongoMessage) -> Self {
        Self {
            id: m.id,
            thread_id: m.thread_id,
            user_id: m.user_id,
            role: m.role,
            content: m.content,
            name: m.name,
            multimodal_image: m.multimodal_image,
            model_type: m.model_type,
            created_at: m.created_at,
            is_deleted: m.is_deleted,
        }
    }
}

impl From<Document> for MongoDocument {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            thread_id: d.thread_id,
            user_id: d.user_id,
            name: d.name,
            created_at: d.created_at,
            is_deleted: d.is_deleted,
        }
    }
}

impl From<MongoDocument> for Document {
    fn from(d: MongoDocument) -> Self {
        Self {
            id: d.id,
            thread_id: d.thread_id,
            user_id: d.user_id,
            name: d.name,
            created_at: d.created_at,
            is_deleted: d.is_deleted,
        }
    }
}

impl From<DocumentChunk> for MongoDocumentChunk {
    fn from(c: DocumentChunk) -> Self {
        Self {
            id: c.id,
            document_id: c.document_id,
            thread_id: c.thread_id,
            user_id: c.user_id,
            name: c.name,
            chunk_index: c.chunk_index,
            content: c.content,
            embedding: c.embedding,
            is_deleted: c.is_deleted,
        }
    }
}

impl From<MongoDocumentChunk> for DocumentChunk {
    fn from(c: MongoDocumentChunk) -> Self {
        Self {
            id: c.id,
            document_id: c.document_id,
            thread_id: c.thread_id,
            user_id: c.user_id,
            name: c.name,
            chunk_index: c.chunk_index,
            content: c.content,
            embedding: c.embedding,
            is_deleted: c.is_deleted,
        }
    }
}

impl From<Extension> for MongoExtension {
    fn from(e: Extension) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            name: e.name,
            description: e.description,
            execution_steps: e.execution_steps,
            functions: e.functions,
            headers: e.headers,
            is_published: e.is_published,
            created_at: e.created_at,
        }
    }
}

impl From<MongoExtension> for Extension {
    fn from(e: MongoExtension) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            name: e.name,
            description: e.description,
            execution_steps: e.execution_steps,
            functions: e.functions,
            headers: e.headers,
            is_published: e.is_published,
            created_at: e.created_at,
        }
    }
}
