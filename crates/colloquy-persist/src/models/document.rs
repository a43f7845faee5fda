use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Uploaded document attached to a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub thread_id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Document {
    pub fn new(
        thread_id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            user_id: user_id.into(),
            name: name.into(),
            created_at: Utc::now(),
            is_deleted: false,
        }
    }
}

/// Searchable slice of a document's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub thread_id: String,
    pub user_id: String,
    /// Name of the source document, used for citations
    pub name: String,
    pub chunk_index: u32,
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub is_deleted: bool,
}
