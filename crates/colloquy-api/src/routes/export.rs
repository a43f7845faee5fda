use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use colloquy_export::{ExportFormat, ExportRequest};

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// Email of the user to export (internal requests only)
    pub user_email: Option<String>,
    /// Storage partition key of the user (internal requests only)
    pub legacy_user_id: Option<String>,
    /// `portal` for the portal import format, raw otherwise
    pub format: Option<String>,
}

/// Export a user's chat history as a JSON attachment
///
/// With a valid `x-internal-token` header any user can be exported by email
/// or legacy id. Otherwise the caller exports their own history.
#[utoipa::path(
    get,
    path = "/api/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "Export document", content_type = "application/json"),
        (status = 400, description = "Missing identity or unresolvable partition"),
        (status = 401, description = "Invalid token or not authenticated")
    ),
    tag = "export"
)]
pub async fn export_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    user: Option<CurrentUser>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<impl IntoResponse> {
    let request = export_request(&state, &headers, user, query)?;

    let document = state.exporter.export(request).await?;
    let disposition = format!("attachment; filename=\"{}\"", document.file_name);

    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(document.body)))
}

fn export_request(
    state: &AppState,
    headers: &HeaderMap,
    user: Option<CurrentUser>,
    query: ExportQuery,
) -> ApiResult<ExportRequest> {
    let format = ExportFormat::parse(query.format.as_deref());

    // An empty header falls through to the caller's own identity
    let provided_token = headers
        .get(INTERNAL_TOKEN_HEADER)
        .filter(|value| !value.is_empty());

    if let Some(provided) = provided_token {
        let configured = state.config.export_internal_token.as_deref();
        let valid = match (provided.to_str(), configured) {
            (Ok(provided), Some(configured)) => provided == configured,
            _ => false,
        };
        if !valid {
            return Err(ApiError::Authentication("Invalid internal token".to_string()));
        }

        let user_email = non_blank(query.user_email);
        let legacy_user_id = non_blank(query.legacy_user_id);
        if user_email.is_none() && legacy_user_id.is_none() {
            return Err(ApiError::Validation(
                "Missing required userEmail or legacyUserId query parameter for internal export"
                    .to_string(),
            ));
        }
        if let Some(legacy) = legacy_user_id.as_deref() {
            if !is_partition_key(legacy) {
                return Err(ApiError::Validation(
                    "legacyUserId may only contain letters, digits, '-', '_' and '.'".to_string(),
                ));
            }
        }

        tracing::info!(by_email = user_email.is_some(), "Internal export requested");
        return Ok(ExportRequest {
            user_email,
            legacy_user_id,
            format,
        });
    }

    let user = user.ok_or_else(|| ApiError::Authentication("User not authenticated".to_string()))?;
    Ok(ExportRequest {
        user_email: Some(user.email),
        legacy_user_id: None,
        format,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Partition keys end up in the attachment file name
fn is_partition_key(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_key_charset() {
        assert!(is_partition_key("legacy-42"));
        assert!(is_partition_key("a1B2_c3.d4"));
        assert!(!is_partition_key("quote\"id"));
        assert!(!is_partition_key("line\nbreak"));
        assert!(!is_partition_key("semi;colon"));
        assert!(!is_partition_key("sp ace"));
    }
}
