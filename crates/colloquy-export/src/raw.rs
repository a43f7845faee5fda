//! Raw export format: the stored records as the chat history store keeps
//! them, grouped per thread.

use chrono::{DateTime, Utc};
use colloquy_persist::{Document, Message, Thread};
use serde::Serialize;

use crate::bundle::ThreadBundle;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExport<'a> {
    pub user_id: &'a str,
    pub legacy_user_id: &'a str,
    pub threads: Vec<RawBundle<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RawBundle<'a> {
    pub thread: RawThread<'a>,
    pub messages: Vec<RawMessage<'a>>,
    pub documents: Vec<RawDocument<'a>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawThread<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub user_name: &'a str,
    pub name: &'a str,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub persona_message: &'a str,
    pub persona_message_title: &'a str,
    pub extension: &'a [String],
    pub bookmarked: bool,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage<'a> {
    pub id: &'a str,
    pub thread_id: &'a str,
    pub user_id: &'a str,
    pub role: &'static str,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(rename = "multiModalImage", skip_serializing_if = "Option::is_none")]
    pub multimodal_image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_type: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument<'a> {
    pub id: &'a str,
    pub chat_thread_id: &'a str,
    pub user_id: &'a str,
    pub name: &'a str,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl<'a> From<&'a Thread> for RawThread<'a> {
    fn from(t: &'a Thread) -> Self {
        Self {
            id: &t.id,
            user_id: &t.user_id,
            user_name: &t.user_name,
            name: &t.name,
            created_at: t.created_at,
            last_message_at: t.last_message_at,
            persona_message: &t.persona_message,
            persona_message_title: &t.persona_title,
            extension: &t.extensions,
            bookmarked: t.bookmarked,
            is_deleted: t.is_deleted,
        }
    }
}

impl<'a> From<&'a Message> for RawMessage<'a> {
    fn from(m: &'a Message) -> Self {
        Self {
            id: &m.id,
            thread_id: &m.thread_id,
            user_id: &m.user_id,
            role: m.role.as_str(),
            content: &m.content,
            name: m.name.as_deref(),
            multimodal_image: m.multimodal_image.as_deref(),
            model_type: m.model_type.as_deref(),
            created_at: m.created_at,
            is_deleted: m.is_deleted,
        }
    }
}

impl<'a> From<&'a Document> for RawDocument<'a> {
    fn from(d: &'a Document) -> Self {
        Self {
            id: &d.id,
            chat_thread_id: &d.thread_id,
            user_id: &d.user_id,
            name: &d.name,
            created_at: d.created_at,
            is_deleted: d.is_deleted,
        }
    }
}

/// `user_id` is the owner email when known, else the partition key
pub fn to_raw<'a>(bundles: &'a [ThreadBundle], user_id: &'a str, legacy_user_id: &'a str) -> RawExport<'a> {
    RawExport {
        user_id,
        legacy_user_id,
        threads: bundles
            .iter()
            .map(|bundle| RawBundle {
                thread: RawThread::from(&bundle.thread),
                messages: bundle.messages.iter().map(RawMessage::from).collect(),
                documents: bundle.documents.iter().map(RawDocument::from).collect(),
            })
            .collect(),
    }
}
