use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

pub const DEFAULT_THREAD_NAME: &str = "New Chat";

/// Database-agnostic thread model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    /// Partition key: hashed owner identity
    pub user_id: String,
    pub user_name: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    #[serde(default)]
    pub persona_message: String,
    #[serde(default)]
    pub persona_title: String,
    /// Attached extension ids
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub bookmarked: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Thread {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            user_name: user_name.into(),
            name: DEFAULT_THREAD_NAME.to_string(),
            created_at: now,
            last_message_at: now,
            persona_message: String::new(),
            persona_title: String::new(),
            extensions: Vec::new(),
            bookmarked: false,
            is_deleted: false,
        }
    }

    pub fn has_default_name(&self) -> bool {
        self.name == DEFAULT_THREAD_NAME
    }
}
