use std::sync::Arc;

use colloquy_persist::PersistenceClient;
use serde_json::Value;

use crate::bundle::assemble;
use crate::error::{ExportError, Result};
use crate::partition::PartitionResolver;
use crate::portal::to_portal;
use crate::raw::to_raw;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Raw,
    Portal,
}

impl ExportFormat {
    /// `portal` selects the portal format; anything else is raw
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("portal") => Self::Portal,
            _ => Self::Raw,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub user_email: Option<String>,
    pub legacy_user_id: Option<String>,
    pub format: ExportFormat,
}

/// Serialized export plus the attachment file name
#[derive(Debug, Clone)]
pub struct ExportDocument {
    pub file_name: String,
    pub body: Value,
}

pub struct ExportService {
    resolver: PartitionResolver,
}

impl ExportService {
    pub fn new(persistence: Arc<dyn PersistenceClient>) -> Self {
        Self {
            resolver: PartitionResolver::new(persistence),
        }
    }

    pub async fn export(&self, request: ExportRequest) -> Result<ExportDocument> {
        let email = request
            .user_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());

        if request.format == ExportFormat::Portal && email.is_none() {
            return Err(ExportError::Validation(
                "Portal export requires userEmail. Provide userEmail alongside legacyUserId."
                    .to_string(),
            ));
        }

        let resolution = self
            .resolver
            .resolve(email, request.legacy_user_id.as_deref())
            .await?;
        let legacy_user_id = resolution.partition_key;

        if !resolution.data.has_content() {
            tracing::warn!(
                partition_key = %legacy_user_id,
                candidates = %resolution.candidates.join(", "),
                "Export found no content for any candidate partition"
            );
        }

        let data = resolution.data;
        let assembly = assemble(data.threads, data.messages, data.documents);
        if assembly.has_orphans() {
            tracing::warn!(
                partition_key = %legacy_user_id,
                orphaned_messages = assembly.orphaned_messages,
                orphaned_documents = assembly.orphaned_documents,
                "Export skipped records whose thread is missing"
            );
        }

        let document = match request.format {
            ExportFormat::Portal => {
                // checked above
                let email = email.unwrap_or_default();
                let portal = to_portal(&assembly.bundles, email, &legacy_user_id);
                ExportDocument {
                    file_name: format!("threads-portal-{}.json", legacy_user_id),
                    body: serde_json::to_value(portal)?,
                }
            }
            ExportFormat::Raw => {
                let user_id = email.unwrap_or(&legacy_user_id);
                let raw = to_raw(&assembly.bundles, user_id, &legacy_user_id);
                ExportDocument {
                    file_name: format!("threads-{}.json", legacy_user_id),
                    body: serde_json::to_value(raw)?,
                }
            }
        };

        tracing::info!(
            partition_key = %legacy_user_id,
            threads = assembly.bundles.len(),
            format = ?request.format,
            "Export assembled"
        );

        Ok(document)
    }
}
