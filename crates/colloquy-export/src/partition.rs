use std::sync::Arc;

use colloquy_persist::{Document, Message, PersistenceClient, Thread};
use sha2::{Digest, Sha256};

use crate::error::{ExportError, Result};

/// Lowercase hex SHA-256, the storage partition key format
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Candidate partition keys in the order they are tried: hash of the
/// trimmed email, hash of its lowercase form when different, then the
/// legacy identifier.
pub fn partition_candidates(email: Option<&str>, legacy_id: Option<&str>) -> Vec<String> {
    let mut candidates = Vec::new();

    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        let direct = sha256_hex(email);
        let lower = sha256_hex(&email.to_lowercase());
        candidates.push(direct.clone());
        if lower != direct {
            candidates.push(lower);
        }
    }

    if let Some(legacy_id) = legacy_id.map(str::trim).filter(|id| !id.is_empty()) {
        if !candidates.iter().any(|c| c == legacy_id) {
            candidates.push(legacy_id.to_string());
        }
    }

    candidates
}

/// Everything stored under one partition key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionData {
    pub threads: Vec<Thread>,
    pub messages: Vec<Message>,
    pub documents: Vec<Document>,
}

impl PartitionData {
    pub fn has_content(&self) -> bool {
        !self.threads.is_empty() || !self.messages.is_empty() || !self.documents.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub partition_key: String,
    pub data: PartitionData,
    /// Every candidate derived, in order
    pub candidates: Vec<String>,
}

pub struct PartitionResolver {
    persistence: Arc<dyn PersistenceClient>,
}

impl PartitionResolver {
    pub fn new(persistence: Arc<dyn PersistenceClient>) -> Self {
        Self { persistence }
    }

    /// First candidate with any stored content, or the last one tried when
    /// none has content.
    pub async fn resolve(&self, email: Option<&str>, legacy_id: Option<&str>) -> Result<Resolution> {
        let candidates = partition_candidates(email, legacy_id);
        if candidates.is_empty() {
            return Err(ExportError::Resolution(
                "no email or legacy identifier supplied".to_string(),
            ));
        }

        let mut resolved = None;
        for candidate in &candidates {
            let data = self.fetch(candidate).await?;
            tracing::debug!(
                candidate = %candidate,
                threads = data.threads.len(),
                messages = data.messages.len(),
                documents = data.documents.len(),
                "Tried partition candidate"
            );

            let found = data.has_content();
            resolved = Some((candidate.clone(), data));
            if found {
                break;
            }
        }

        let (partition_key, data) = resolved
            .ok_or_else(|| ExportError::Resolution("no candidate was tried".to_string()))?;

        tracing::info!(
            partition_key = %partition_key,
            has_content = data.has_content(),
            tried = candidates.len(),
            "Resolved export partition"
        );

        Ok(Resolution {
            partition_key,
            data,
            candidates,
        })
    }

    async fn fetch(&self, partition_key: &str) -> Result<PartitionData> {
        let (threads, messages, documents) = tokio::try_join!(
            self.persistence.list_threads(partition_key),
            self.persistence.list_user_messages(partition_key),
            self.persistence.list_user_documents(partition_key),
        )?;

        Ok(PartitionData {
            threads,
            messages,
            documents,
        })
    }
}
