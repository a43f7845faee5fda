//! Portal import format.
//!
//! Every thread, message and document carries a `metadata` block flagging it
//! as a legacy transcript and pointing back at where it came from.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bundle::ThreadBundle;

#[derive(Debug, Clone, Serialize)]
pub struct PortalExport {
    pub user: PortalUser,
    pub threads: Vec<PortalThread>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalUser {
    pub email: String,
    pub legacy_user_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalThread {
    pub id: String,
    /// Owner email, not the partition key
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub persona_message: String,
    pub persona_message_title: String,
    /// Attached extension ids
    pub extension: Vec<String>,
    pub metadata: ThreadMetadata,
    pub messages: Vec<PortalMessage>,
    pub documents: Vec<PortalDocument>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMetadata {
    pub legacy_transcript: bool,
    pub source_legacy_user_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalMessage {
    pub id: String,
    pub thread_id: String,
    /// Position in creation order
    pub index: usize,
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "multiModalImage", skip_serializing_if = "Option::is_none")]
    pub multimodal_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    pub metadata: MessageMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    pub legacy_transcript: bool,
    pub source_thread_id: String,
    pub source_message_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalDocument {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub legacy_transcript: bool,
    pub source_thread_id: String,
}

/// Reshape assembled bundles for portal import. Bundles must already hold
/// messages in creation order.
pub fn to_portal(bundles: &[ThreadBundle], user_email: &str, legacy_user_id: &str) -> PortalExport {
    PortalExport {
        user: PortalUser {
            email: user_email.to_string(),
            legacy_user_id: legacy_user_id.to_string(),
        },
        threads: bundles
            .iter()
            .map(|bundle| portal_thread(bundle, user_email, legacy_user_id))
            .collect(),
    }
}

fn portal_thread(bundle: &ThreadBundle, user_email: &str, legacy_user_id: &str) -> PortalThread {
    let thread = &bundle.thread;

    let messages = bundle
        .messages
        .iter()
        .enumerate()
        .map(|(index, message)| PortalMessage {
            id: message.id.clone(),
            thread_id: thread.id.clone(),
            index,
            role: message.role.to_string(),
            content: message.content.clone(),
            name: message.name.clone(),
            created_at: message.created_at,
            multimodal_image: message.multimodal_image.clone(),
            model_type: message.model_type.clone(),
            metadata: MessageMetadata {
                legacy_transcript: true,
                source_thread_id: thread.id.clone(),
                source_message_id: message.id.clone(),
            },
        })
        .collect();

    let documents = bundle
        .documents
        .iter()
        .map(|document| PortalDocument {
            id: document.id.clone(),
            name: document.name.clone(),
            created_at: document.created_at,
            metadata: DocumentMetadata {
                legacy_transcript: true,
                source_thread_id: thread.id.clone(),
            },
        })
        .collect();

    PortalThread {
        id: thread.id.clone(),
        user_id: user_email.to_string(),
        name: thread.name.clone(),
        created_at: thread.created_at,
        last_message_at: thread.last_message_at,
        persona_message: thread.persona_message.clone(),
        persona_message_title: thread.persona_title.clone(),
        extension: thread.extensions.clone(),
        metadata: ThreadMetadata {
            legacy_transcript: true,
            source_legacy_user_id: legacy_user_id.to_string(),
        },
        messages,
        documents,
    }
}
