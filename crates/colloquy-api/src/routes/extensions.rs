use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use colloquy_persist::{Extension, ExtensionFunction, ExtensionHeader, HttpMethod};

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateExtensionRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub execution_steps: String,
    pub functions: Vec<FunctionBody>,
    #[serde(default)]
    pub headers: Vec<HeaderBody>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FunctionBody {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    #[schema(value_type = Object)]
    pub parameters: serde_json::Value,
    pub endpoint: String,
    #[serde(default)]
    #[schema(value_type = String, example = "GET")]
    pub method: HttpMethod,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HeaderBody {
    pub key: String,
    pub value: String,
}

/// Header values can carry credentials and are never returned
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExtensionResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub execution_steps: String,
    pub functions: Vec<FunctionBody>,
    pub header_keys: Vec<String>,
    pub is_published: bool,
    /// Whether the caller owns the extension
    pub owned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListExtensionsResponse {
    pub extensions: Vec<ExtensionResponse>,
}

/// Create an extension owned by the caller
#[utoipa::path(
    post,
    path = "/api/extensions",
    request_body = CreateExtensionRequest,
    responses(
        (status = 201, description = "Extension created", body = ExtensionResponse),
        (status = 400, description = "Invalid extension")
    ),
    tag = "extensions"
)]
pub async fn create_extension(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<CreateExtensionRequest>,
) -> ApiResult<(StatusCode, Json<ExtensionResponse>)> {
    let extension = build_extension(&user.id, req)?;
    state.persistence.save_extension(extension.clone()).await?;
    tracing::info!(extension_id = %extension.id, functions = extension.functions.len(), "Extension created");

    Ok((StatusCode::CREATED, Json(extension_to_response(extension, &user.id))))
}

/// List the caller's extensions and every published one
#[utoipa::path(
    get,
    path = "/api/extensions",
    responses(
        (status = 200, description = "Visible extensions", body = ListExtensionsResponse)
    ),
    tag = "extensions"
)]
pub async fn list_extensions(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<ListExtensionsResponse>> {
    let extensions = state.persistence.list_extensions(&user.id).await?;

    Ok(Json(ListExtensionsResponse {
        extensions: extensions
            .into_iter()
            .map(|e| extension_to_response(e, &user.id))
            .collect(),
    }))
}

/// Delete one of the caller's extensions
#[utoipa::path(
    delete,
    path = "/api/extensions/{extension_id}",
    params(
        ("extension_id" = String, Path, description = "Extension ID")
    ),
    responses(
        (status = 204, description = "Extension deleted"),
        (status = 404, description = "Extension not found or not owned")
    ),
    tag = "extensions"
)]
pub async fn delete_extension(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(extension_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.persistence.delete_extension(&user.id, &extension_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn build_extension(user_id: &str, req: CreateExtensionRequest) -> ApiResult<Extension> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Extension name must not be empty".to_string()));
    }
    if req.functions.is_empty() {
        return Err(ApiError::Validation("Extension needs at least one function".to_string()));
    }

    let mut functions = Vec::with_capacity(req.functions.len());
    for function in req.functions {
        if function.name.trim().is_empty() {
            return Err(ApiError::Validation("Function name must not be empty".to_string()));
        }
        if reqwest::Url::parse(&function.endpoint).is_err() {
            return Err(ApiError::Validation(format!(
                "Function '{}' has an invalid endpoint",
                function.name
            )));
        }
        functions.push(ExtensionFunction {
            name: function.name.trim().to_string(),
            description: function.description,
            parameters: function.parameters,
            endpoint: function.endpoint,
            method: function.method,
            enabled: function.enabled,
        });
    }

    Ok(Extension {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        description: req.description,
        execution_steps: req.execution_steps,
        functions,
        headers: req
            .headers
            .into_iter()
            .map(|h| ExtensionHeader {
                key: h.key,
                value: h.value,
            })
            .collect(),
        is_published: req.is_published,
        created_at: Utc::now(),
    })
}

fn extension_to_response(extension: Extension, user_id: &str) -> ExtensionResponse {
    ExtensionResponse {
        owned: extension.user_id == user_id,
        id: extension.id,
        name: extension.name,
        description: extension.description,
        execution_steps: extension.execution_steps,
        functions: extension
            .functions
            .into_iter()
            .map(|f| FunctionBody {
                name: f.name,
                description: f.description,
                parameters: f.parameters,
                endpoint: f.endpoint,
                method: f.method,
                enabled: f.enabled,
            })
            .collect(),
        header_keys: extension.headers.into_iter().map(|h| h.key).collect(),
        is_published: extension.is_published,
        created_at: extension.created_at,
    }
}
