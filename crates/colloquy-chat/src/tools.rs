use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use colloquy_llm::{ImageClient, ImageRequest, Tool};
use colloquy_persist::{Extension, ExtensionFunction, ExtensionHeader, HttpMethod};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::images::{image_url, ImageStore};

/// A function the model can call
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> Tool;

    /// Execute with the raw JSON argument text produced by the model
    async fn call(&self, arguments: &str) -> Result<String>;
}

/// Function name → handler, in registration order
#[derive(Default, Clone)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; a later handler with the same name replaces the earlier one
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.definition().function.name;
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::warn!(tool = %name, "Tool registered twice, keeping the latest");
        } else {
            self.order.push(name);
        }
    }

    /// Register every enabled function of an extension
    pub fn register_extension(&mut self, extension: &Extension, http: &reqwest::Client, max_response_bytes: usize) {
        for function in extension.enabled_functions() {
            self.register(Arc::new(HttpExtensionTool::new(
                function.clone(),
                extension.headers.clone(),
                http.clone(),
                max_response_bytes,
            )));
        }
    }

    pub fn definitions(&self) -> Vec<Tool> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| handler.definition())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Run a call; failures become result text for the model
    pub async fn execute(&self, name: &str, arguments: &str) -> String {
        let Some(handler) = self.handlers.get(name) else {
            tracing::warn!(tool = %name, "Model called an unknown tool");
            return format!("Error: unknown function '{}'", name);
        };

        let started = std::time::Instant::now();
        match handler.call(arguments).await {
            Ok(result) => {
                tracing::info!(
                    tool = %name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Tool call succeeded"
                );
                result
            }
            Err(e) => {
                tracing::warn!(tool = %name, error = %format!("{:#}", e), "Tool call failed");
                format!("Error: {:#}", e)
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ExtensionArguments {
    #[serde(default)]
    query: Option<Map<String, Value>>,
    #[serde(default)]
    body: Option<Value>,
}

/// Calls an extension function's HTTP endpoint
pub struct HttpExtensionTool {
    function: ExtensionFunction,
    headers: Vec<ExtensionHeader>,
    http: reqwest::Client,
    max_response_bytes: usize,
}

impl HttpExtensionTool {
    pub fn new(
        function: ExtensionFunction,
        headers: Vec<ExtensionHeader>,
        http: reqwest::Client,
        max_response_bytes: usize,
    ) -> Self {
        Self {
            function,
            headers,
            http,
            max_response_bytes,
        }
    }

    fn method(&self) -> reqwest::Method {
        match self.function.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

fn query_pairs(query: &Map<String, Value>) -> Vec<(String, String)> {
    query
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

fn truncate_utf8(mut text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text
}

#[async_trait]
impl ToolHandler for HttpExtensionTool {
    fn definition(&self) -> Tool {
        Tool::new(
            self.function.name.clone(),
            self.function.description.clone(),
            self.function.parameters.clone(),
        )
    }

    async fn call(&self, arguments: &str) -> Result<String> {
        let args: ExtensionArguments = if arguments.trim().is_empty() {
            ExtensionArguments::default()
        } else {
            serde_json::from_str(arguments).context("Invalid function arguments")?
        };

        let method = self.method();
        let mut request = self.http.request(method.clone(), &self.function.endpoint);

        for header in &self.headers {
            request = request.header(&header.key, &header.value);
        }
        if let Some(query) = &args.query {
            request = request.query(&query_pairs(query));
        }
        if method != reqwest::Method::GET {
            if let Some(body) = &args.body {
                request = request.json(body);
            }
        }

        tracing::debug!(
            function = %self.function.name,
            endpoint = %self.function.endpoint,
            method = %method,
            "Calling extension endpoint"
        );

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.function.endpoint))?;
        let status = response.status();
        let text = response.text().await.context("Failed to read extension response")?;

        if !status.is_success() {
            anyhow::bail!(
                "Extension endpoint returned {}: {}",
                status,
                truncate_utf8(text, self.max_response_bytes)
            );
        }

        Ok(truncate_utf8(text, self.max_response_bytes))
    }
}

#[derive(Debug, Deserialize)]
struct CreateImageArguments {
    prompt: String,
}

/// Default tool: generate an image and return its public URL
pub struct CreateImageTool {
    client: Arc<dyn ImageClient>,
    deployment: String,
    store: Arc<dyn ImageStore>,
    thread_id: String,
    public_base_url: String,
}

impl CreateImageTool {
    pub const NAME: &'static str = "create_image";

    pub fn new(
        client: Arc<dyn ImageClient>,
        deployment: impl Into<String>,
        store: Arc<dyn ImageStore>,
        thread_id: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            deployment: deployment.into(),
            store,
            thread_id: thread_id.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for CreateImageTool {
    fn definition(&self) -> Tool {
        Tool::new(
            Self::NAME,
            "Create an image from a detailed text description. Returns the URL of the generated image.",
            json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Detailed description of the image to generate"
                    }
                },
                "required": ["prompt"]
            }),
        )
    }

    async fn call(&self, arguments: &str) -> Result<String> {
        let args: CreateImageArguments =
            serde_json::from_str(arguments).context("Invalid create_image arguments")?;

        let generated = self
            .client
            .generate_image(ImageRequest::new(&self.deployment, &args.prompt))
            .await?;
        let bytes = STANDARD
            .decode(generated.b64_json.as_bytes())
            .context("Image service returned invalid base64")?;

        let file_name = format!("{}.png", uuid::Uuid::new_v4());
        self.store.save(&self.thread_id, &file_name, bytes).await?;

        let url = image_url(&self.public_base_url, &self.thread_id, &file_name);
        Ok(json!({
            "url": url,
            "revised_prompt": generated.revised_prompt,
        })
        .to_string())
    }
}
