// Azure OpenAI client implementation

use crate::streaming::parse_chat_sse_stream;
use crate::traits::{
    ChatClient, ChatOptions, ChatRequest, ChatResponse, EmbeddingClient, EmbeddingRequest,
    EventStream, GeneratedImage, ImageClient, ImageRequest, LLMClient, TokenUsage,
};
use crate::types::{Content, ContentPart, Message, ToolCall};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Azure OpenAI client (HTTP direct, no SDK)
///
/// Azure OpenAI uses a different endpoint structure and authentication method than OpenAI:
/// - URL: https://{resource}.openai.azure.com/openai/deployments/{deployment}/...
/// - Auth header: api-key instead of Authorization: Bearer
/// - Deployment name is passed via the model parameter in each request
#[derive(Debug)]
pub struct AzureOpenAIClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_version: String,
}

impl AzureOpenAIClient {
    /// Create new Azure OpenAI client with builder pattern
    pub fn builder() -> AzureOpenAIClientBuilder {
        AzureOpenAIClientBuilder::default()
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Build chat completion request payload
    pub(crate) fn build_chat_request(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: &ChatOptions,
        stream: bool,
    ) -> Result<Value> {
        let azure_messages: Vec<Value> = messages
            .into_iter()
            .map(convert_message)
            .collect::<Result<Vec<_>>>()?;

        let mut obj = Map::new();
        obj.insert("messages".to_string(), Value::Array(azure_messages));
        obj.insert("stream".to_string(), Value::Bool(stream));

        let is_reasoning_model = options.reasoning_model
            || model.starts_with("o1")
            || model.starts_with("o3")
            || model.starts_with("gpt-5");

        if let Some(temp) = options.temperature {
            // Reasoning deployments reject temperature
            if !is_reasoning_model {
                obj.insert("temperature".to_string(), serde_json::json!(temp));
            }
        }
        if let Some(max_tokens) = options.max_tokens {
            let token_field = if is_reasoning_model {
                "max_completion_tokens"
            } else {
                "max_tokens"
            };
            obj.insert(token_field.to_string(), serde_json::json!(max_tokens));
        }
        if let Some(ref reasoning_effort) = options.reasoning_effort {
            obj.insert("reasoning_effort".to_string(), serde_json::json!(reasoning_effort));
        }
        if let Some(tools) = options.tools.as_ref().filter(|t| !t.is_empty()) {
            obj.insert("tools".to_string(), serde_json::to_value(tools)?);
            if let Some(tool_choice) = &options.tool_choice {
                obj.insert("tool_choice".to_string(), tool_choice.to_value());
            }
            if let Some(parallel) = options.parallel_tool_calls {
                obj.insert("parallel_tool_calls".to_string(), Value::Bool(parallel));
            }
        }

        Ok(Value::Object(obj))
    }

    /// Build the full URL for an Azure OpenAI endpoint
    fn build_url(&self, deployment_name: &str, path: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint, deployment_name, path, self.api_version
        )
    }

    async fn post(&self, url: &str, payload: &Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(url)
            .json(payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Azure OpenAI API error ({}): {}", status, error_text);
        }

        Ok(response)
    }
}

/// Convert our Message type to the chat completions wire format
fn convert_message(message: Message) -> Result<Value> {
    let mut obj = Map::new();
    obj.insert("role".to_string(), Value::String(message.role().to_string()));

    match message {
        Message::System { content } | Message::Developer { content } | Message::Human { content } => {
            obj.insert("content".to_string(), convert_content(content));
        }
        Message::AI { content, tool_calls } => {
            if let Some(content) = content {
                obj.insert("content".to_string(), convert_content(content));
            }
            if let Some(tool_calls) = tool_calls {
                obj.insert("tool_calls".to_string(), serde_json::to_value(tool_calls)?);
            }
        }
        Message::Tool { tool_call_id, content } => {
            obj.insert("tool_call_id".to_string(), Value::String(tool_call_id));
            obj.insert("content".to_string(), convert_content(content));
        }
    }

    Ok(Value::Object(obj))
}

/// Convert Content to wire format (string or array of parts)
fn convert_content(content: Content) -> Value {
    match content {
        Content::Text(s) => Value::String(s),
        Content::Parts(parts) => Value::Array(
            parts
                .into_iter()
                .map(|part| match part {
                    ContentPart::Text { text } => serde_json::json!({
                        "type": "text",
                        "text": text,
                    }),
                    ContentPart::ImageUrl { image_url } => serde_json::json!({
                        "type": "image_url",
                        "image_url": image_url,
                    }),
                })
                .collect(),
        ),
    }
}

/// Builder for AzureOpenAIClient
#[derive(Default)]
pub struct AzureOpenAIClientBuilder {
    api_key: Option<String>,
    endpoint: Option<String>,
    api_version: Option<String>,
}

impl AzureOpenAIClientBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the Azure OpenAI endpoint (base URL)
    /// Example: "https://my-resource.openai.azure.com"
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn build(self) -> Result<AzureOpenAIClient> {
        let api_key = self.api_key.context("API key is required")?;
        let endpoint = self.endpoint.context("Endpoint is required")?;
        let api_version = self.api_version.context("API version is required")?;

        let endpoint = endpoint.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "api-key",
            HeaderValue::from_str(&api_key).context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(AzureOpenAIClient {
            http_client,
            endpoint,
            api_version,
        })
    }
}

// ============================================================================
// TRAIT IMPLEMENTATIONS
// ============================================================================

#[async_trait]
impl ChatClient for AzureOpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_chat_request(
            &request.model,
            request.messages,
            &request.options,
            false,
        )?;

        let url = self.build_url(&request.model, "chat/completions");
        let raw: AzureChatResponse = self
            .post(&url, &payload)
            .await?
            .json()
            .await
            .context("Failed to parse response")?;

        let choice = raw.choices.first();
        Ok(ChatResponse {
            content: choice.and_then(|c| c.message.content.clone()),
            tool_calls: choice.and_then(|c| c.message.tool_calls.clone()),
            usage: raw.usage.as_ref().map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.and_then(|c| c.finish_reason.clone()),
            raw: serde_json::to_value(&raw)?,
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let payload = self.build_chat_request(
            &request.model,
            request.messages,
            &request.options,
            true,
        )?;

        let url = self.build_url(&request.model, "chat/completions");
        tracing::debug!(deployment = %request.model, "opening chat completion stream");

        let response = self.post(&url, &payload).await?;
        Ok(parse_chat_sse_stream(response.bytes_stream()))
    }
}

#[async_trait]
impl EmbeddingClient for AzureOpenAIClient {
    async fn embed(&self, request: EmbeddingRequest) -> Result<Vec<Vec<f32>>> {
        if request.input.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.build_url(&request.model, "embeddings");
        let payload = serde_json::json!({ "input": request.input });

        let mut raw: AzureEmbeddingResponse = self
            .post(&url, &payload)
            .await?
            .json()
            .await
            .context("Failed to parse embedding response")?;

        // The API does not promise ordering
        raw.data.sort_by_key(|d| d.index);
        Ok(raw.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl ImageClient for AzureOpenAIClient {
    async fn generate_image(&self, request: ImageRequest) -> Result<GeneratedImage> {
        let url = self.build_url(&request.model, "images/generations");
        let payload = serde_json::json!({
            "prompt": request.prompt,
            "n": 1,
            "size": request.size,
            "response_format": "b64_json",
        });

        let raw: AzureImageResponse = self
            .post(&url, &payload)
            .await?
            .json()
            .await
            .context("Failed to parse image response")?;

        let image = raw
            .data
            .into_iter()
            .next()
            .context("Image response contained no data")?;

        Ok(GeneratedImage {
            b64_json: image.b64_json,
            revised_prompt: image.revised_prompt,
        })
    }
}

impl LLMClient for AzureOpenAIClient {}

// ============================================================================
// AZURE-SPECIFIC RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AzureChatResponse {
    pub id: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResponseMessage {
    pub role: String,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AzureEmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct AzureImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: String,
    revised_prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tool;

    fn client() -> AzureOpenAIClient {
        AzureOpenAIClient::builder()
            .api_key("test-key")
            .endpoint("https://test-resource.openai.azure.com/")
            .api_version("2024-02-15-preview")
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_url_strips_trailing_slash() {
        let url = client().build_url("gpt-4o", "chat/completions");
        assert_eq!(
            url,
            "https://test-resource.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-15-preview"
        );
    }

    #[test]
    fn test_reasoning_payload_uses_completion_tokens() {
        let options = ChatOptions::new()
            .temperature(0.7)
            .max_tokens(500)
            .reasoning_model(true);
        let payload = client()
            .build_chat_request("my-deployment", vec![Message::developer("hi")], &options, true)
            .unwrap();

        assert!(payload.get("temperature").is_none());
        assert_eq!(payload["max_completion_tokens"], 500);
        assert_eq!(payload["messages"][0]["role"], "developer");
    }

    #[test]
    fn test_tool_choice_only_sent_with_tools() {
        let options = ChatOptions::new().tool_choice(crate::ToolChoice::auto());
        let payload = client()
            .build_chat_request("gpt-4o", vec![Message::human("hi")], &options, true)
            .unwrap();
        assert!(payload.get("tool_choice").is_none());

        let options = options
            .tools(vec![Tool::new("lookup", "Lookup", serde_json::json!({"type": "object"}))])
            .parallel_tool_calls(false);
        let payload = client()
            .build_chat_request("gpt-4o", vec![Message::human("hi")], &options, true)
            .unwrap();
        assert_eq!(payload["tool_choice"], "auto");
        assert_eq!(payload["parallel_tool_calls"], false);
        assert_eq!(payload["tools"][0]["function"]["name"], "lookup");
    }

    #[test]
    fn test_image_part_conversion() {
        let msg = Message::human(Content::text_with_image("what is this?", "data:image/png;base64,AAAA"));
        let value = convert_message(msg).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][1]["type"], "image_url");
        assert_eq!(value["content"][1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }
}
