// Provider configuration and client construction

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::azure_openai::AzureOpenAIClient;
use crate::traits::LLMClient;

/// Connection settings for one Azure OpenAI API version
///
/// Deployment names are not part of the connection; they travel in the
/// `model` field of each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    pub api_key: String,
    pub endpoint: String,
    pub api_version: String,
}

impl AzureConfig {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            api_version: api_version.into(),
        }
    }

    /// Same resource and key, different API version
    pub fn with_api_version(&self, api_version: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            ..self.clone()
        }
    }
}

/// Factory for creating LLM clients from configuration
pub struct ClientFactory;

impl ClientFactory {
    pub fn create_client(config: AzureConfig) -> Result<Arc<dyn LLMClient>> {
        let client = AzureOpenAIClient::builder()
            .api_key(config.api_key)
            .endpoint(config.endpoint)
            .api_version(config.api_version)
            .build()?;
        Ok(Arc::new(client))
    }
}
