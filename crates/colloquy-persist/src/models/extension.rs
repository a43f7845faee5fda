use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// User-defined bundle of HTTP-callable functions offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    /// Appended to the system prompt when the extension is attached
    #[serde(default)]
    pub execution_steps: String,
    #[serde(default)]
    pub functions: Vec<ExtensionFunction>,
    #[serde(default)]
    pub headers: Vec<ExtensionHeader>,
    #[serde(default)]
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionFunction {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: serde_json::Value,
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionHeader {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Extension {
    /// Visible to `user_id` when owned or published
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        self.user_id == user_id || self.is_published
    }

    pub fn enabled_functions(&self) -> impl Iterator<Item = &ExtensionFunction> {
        self.functions.iter().filter(|f| f.enabled)
    }
}
