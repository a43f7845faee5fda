use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use colloquy_chat::{ChunkingConfig, DispatcherConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub mongodb: MongoDbConfig,
    pub azure_openai: AzureOpenAIConfig,
    pub chat: ChatConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    /// Base URL used in links handed back to clients (image URLs)
    pub public_url: String,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: String,
    #[serde(default)]
    pub azure_openai_api_key: String,
    /// Unset disables internal export
    #[serde(default)]
    pub export_internal_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a request, streaming included
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoDbConfig {
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureOpenAIConfig {
    pub endpoint: String,
    pub api_version: String,
    /// Reasoning deployments are served under a newer API version
    pub reasoning_api_version: String,
    pub chat_deployment: String,
    pub reasoning_deployment: String,
    pub embedding_deployment: String,
    /// Empty disables the image generation tool
    #[serde(default)]
    pub image_deployment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub history_size: usize,
    pub rag_top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_tool_iterations: usize,
    pub extension_response_limit: usize,
    pub multimodal_max_tokens: u32,
    pub assistant_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub image_dir: String,
}

/// Headers set by the fronting auth proxy
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub email_header: String,
    pub name_header: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `COLLOQUY_`-prefixed environment variables, `__` between sections
    ///    (e.g. `COLLOQUY_SERVER__PORT=9000`)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("COLLOQUY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = config.try_deserialize()?;

        // Secrets never live in TOML
        cfg.mongodb_uri = std::env::var("MONGODB_URI")
            .map_err(|_| ConfigError::Message("MONGODB_URI environment variable is required".to_string()))?;
        cfg.azure_openai_api_key = std::env::var("AZURE_OPENAI_API_KEY").map_err(|_| {
            ConfigError::Message("AZURE_OPENAI_API_KEY environment variable is required".to_string())
        })?;
        cfg.export_internal_token = std::env::var("EXPORT_INTERNAL_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        let image_deployment = Some(self.azure_openai.image_deployment.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        DispatcherConfig {
            history_size: self.chat.history_size,
            rag_top_k: self.chat.rag_top_k,
            max_tool_iterations: self.chat.max_tool_iterations,
            extension_response_limit: self.chat.extension_response_limit,
            multimodal_max_tokens: self.chat.multimodal_max_tokens,
            public_base_url: self.public_url.trim_end_matches('/').to_string(),
            image_deployment,
            assistant_name: self.chat.assistant_name.clone(),
        }
    }

    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chat.chunk_size,
            chunk_overlap: self.chat.chunk_overlap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_TOML: &str = include_str!("../../../config/default.toml");

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(DEFAULT_TOML).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.email_header, "x-ms-client-principal-name");
        assert_eq!(config.chat.history_size, 30);
        assert!(config.mongodb_uri.is_empty());
        assert!(config.export_internal_token.is_none());
    }

    #[test]
    fn test_dispatcher_config_mapping() {
        let mut config: Config = toml::from_str(DEFAULT_TOML).unwrap();
        config.public_url = "https://chat.example.com/".to_string();
        config.azure_openai.image_deployment = "  ".to_string();

        let dispatcher = config.dispatcher_config();
        assert_eq!(dispatcher.public_base_url, "https://chat.example.com");
        assert_eq!(dispatcher.image_deployment, None);
        assert_eq!(dispatcher.multimodal_max_tokens, 4096);
        assert_eq!(dispatcher.assistant_name, "Colloquy");

        let chunking = config.chunking();
        assert_eq!(chunking.chunk_size, 2300);
        assert_eq!(chunking.chunk_overlap, 200);
    }
}
