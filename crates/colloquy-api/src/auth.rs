//! Caller identity as asserted by the fronting auth proxy.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use colloquy_chat::ChatUser;
use colloquy_export::sha256_hex;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub email: String,
    pub name: String,
    /// Storage partition key derived from the email
    pub id: String,
}

impl CurrentUser {
    pub fn from_email(email: &str, name: Option<&str>) -> Self {
        let email = email.trim();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(email);
        Self {
            email: email.to_string(),
            name: name.to_string(),
            id: sha256_hex(email),
        }
    }

    pub fn chat_user(&self) -> ChatUser {
        ChatUser {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let auth = &state.config.auth;
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let email = header(&auth.email_header)
            .ok_or_else(|| ApiError::Authentication("User not authenticated".to_string()))?;

        Ok(CurrentUser::from_email(email, header(&auth.name_header)))
    }
}
