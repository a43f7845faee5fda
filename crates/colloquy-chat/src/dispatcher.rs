use std::sync::Arc;

use colloquy_llm::{ChatClient, ChatOptions, ChatRequest, ImageClient, Message};
use colloquy_persist::{
    Extension, Message as StoredMessage, MessageRole, PersistenceClient, Thread,
};
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::fragment::{from_event_stream, FragmentStream};
use crate::images::{decode_data_url, image_url, ImageStore};
use crate::prompts;
use crate::rag::Retriever;
use crate::relay::RelayContext;
use crate::tool_runner::ToolRunner;
use crate::tools::{CreateImageTool, ToolRegistry};

/// Which deployment family answers the turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[default]
    #[serde(alias = "default")]
    Standard,
    #[serde(alias = "o3_reasoning")]
    Reasoning,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Reasoning => "reasoning",
        }
    }
}

/// One user turn as submitted by the client
#[derive(Debug, Clone, Deserialize)]
pub struct UserPrompt {
    #[serde(alias = "id")]
    pub thread_id: String,
    pub message: String,
    /// Image attachment as a `data:` URL
    #[serde(default, alias = "multimodalImage")]
    pub image: Option<String>,
    #[serde(default, alias = "modelType")]
    pub model_type: ModelType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatStrategy {
    Multimodal,
    ChatWithFile,
    Extensions,
}

impl ChatStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Multimodal => "multimodal",
            Self::ChatWithFile => "chat-with-file",
            Self::Extensions => "extensions",
        }
    }
}

/// Strict priority: image, then documents, then extensions
pub fn select_strategy(has_image: bool, document_count: usize) -> ChatStrategy {
    if has_image {
        ChatStrategy::Multimodal
    } else if document_count > 0 {
        ChatStrategy::ChatWithFile
    } else {
        ChatStrategy::Extensions
    }
}

/// Chat client bound to its API version, plus the deployment it targets
#[derive(Clone)]
pub struct ModelProfile {
    pub client: Arc<dyn ChatClient>,
    pub deployment: String,
}

impl ModelProfile {
    pub fn new(client: Arc<dyn ChatClient>, deployment: impl Into<String>) -> Self {
        Self {
            client,
            deployment: deployment.into(),
        }
    }
}

pub const DEFAULT_ASSISTANT_NAME: &str = "Colloquy";

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub history_size: usize,
    pub rag_top_k: usize,
    pub max_tool_iterations: usize,
    /// Extension responses are truncated to this many bytes
    pub extension_response_limit: usize,
    pub multimodal_max_tokens: u32,
    pub public_base_url: String,
    /// Enables the `create_image` tool when set
    pub image_deployment: Option<String>,
    /// Name recorded on assistant messages
    pub assistant_name: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            history_size: 30,
            rag_top_k: 10,
            max_tool_iterations: 10,
            extension_response_limit: 16 * 1024,
            multimodal_max_tokens: 4096,
            public_base_url: "http://localhost:8000".to_string(),
            image_deployment: None,
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
        }
    }
}

/// Authenticated caller of a chat turn
#[derive(Debug, Clone)]
pub struct ChatUser {
    /// Partition key
    pub id: String,
    pub name: String,
}

/// A dispatched turn, ready for the relay
pub struct ChatTurn {
    pub strategy: ChatStrategy,
    pub thread: Thread,
    pub user_message: StoredMessage,
    pub fragments: FragmentStream,
    pub context: RelayContext,
}

pub struct ChatDispatcher {
    standard: ModelProfile,
    reasoning: ModelProfile,
    persistence: Arc<dyn PersistenceClient>,
    retriever: Arc<Retriever>,
    images: Arc<dyn ImageStore>,
    image_client: Option<Arc<dyn ImageClient>>,
    http: reqwest::Client,
    config: DispatcherConfig,
}

impl ChatDispatcher {
    pub fn new(
        standard: ModelProfile,
        reasoning: ModelProfile,
        persistence: Arc<dyn PersistenceClient>,
        retriever: Arc<Retriever>,
        images: Arc<dyn ImageStore>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            standard,
            reasoning,
            persistence,
            retriever,
            images,
            image_client: None,
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_image_client(mut self, client: Arc<dyn ImageClient>) -> Self {
        self.image_client = Some(client);
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn profile(&self, model_type: ModelType) -> &ModelProfile {
        match model_type {
            ModelType::Standard => &self.standard,
            ModelType::Reasoning => &self.reasoning,
        }
    }

    /// Resolve context, persist the user message and open the response stream
    pub async fn dispatch(&self, user: &ChatUser, prompt: UserPrompt) -> Result<ChatTurn> {
        let image = prompt.image.as_deref().filter(|image| !image.is_empty());
        if prompt.message.trim().is_empty() && image.is_none() {
            return Err(ChatError::Validation("Message must not be empty".to_string()));
        }

        let thread = self
            .persistence
            .get_thread(&user.id, &prompt.thread_id)
            .await?
            .ok_or_else(|| ChatError::ThreadNotFound(prompt.thread_id.clone()))?;

        let (history, documents, extensions) = tokio::try_join!(
            self.load_history(&user.id, &thread.id),
            async {
                self.persistence
                    .list_documents(&user.id, &thread.id)
                    .await
                    .map_err(ChatError::from)
            },
            self.load_extensions(&user.id, &thread.extensions),
        )?;

        let strategy = select_strategy(image.is_some(), documents.len());
        tracing::info!(
            thread_id = %thread.id,
            strategy = strategy.as_str(),
            model_type = ?prompt.model_type,
            history = history.len(),
            documents = documents.len(),
            extensions = extensions.len(),
            "Dispatching chat turn"
        );

        let image_link = match image {
            Some(data_url) => Some(self.store_image(&thread.id, data_url).await?),
            None => None,
        };

        let user_message = self
            .save_user_message(user, &thread, &prompt, image_link)
            .await?;
        let thread = self.record_activity(thread, &prompt.message, &user_message).await?;

        let model_type = prompt.model_type;
        let persona = prompts::persona_prompt(&thread.persona_message);

        let fragments = match strategy {
            ChatStrategy::Multimodal => self.multimodal_stream(
                model_type,
                &persona,
                &prompt.message,
                image.unwrap_or_default(),
            ),
            ChatStrategy::ChatWithFile => {
                self.rag_stream(model_type, user, &thread, &persona, history, &prompt.message)
                    .await
            }
            ChatStrategy::Extensions => self.extensions_stream(
                model_type,
                &thread,
                &persona,
                history,
                &extensions,
                &prompt.message,
            ),
        };

        Ok(ChatTurn {
            strategy,
            context: RelayContext {
                persistence: Arc::clone(&self.persistence),
                user_id: user.id.clone(),
                thread_id: thread.id.clone(),
                assistant_name: self.config.assistant_name.clone(),
            },
            thread,
            user_message,
            fragments,
        })
    }

    /// Newest `history_size` messages, in chronological order
    async fn load_history(&self, user_id: &str, thread_id: &str) -> Result<Vec<StoredMessage>> {
        let mut history = self
            .persistence
            .get_recent_messages(user_id, thread_id, self.config.history_size)
            .await?;
        history.reverse();
        Ok(history)
    }

    async fn load_extensions(&self, user_id: &str, ids: &[String]) -> Result<Vec<Extension>> {
        let lookups = ids
            .iter()
            .map(|id| self.persistence.get_extension(user_id, id));
        let found = futures::future::try_join_all(lookups).await?;

        Ok(found
            .into_iter()
            .zip(ids)
            .filter_map(|(extension, id)| {
                if extension.is_none() {
                    tracing::warn!(extension_id = %id, "Attached extension not found, skipping");
                }
                extension
            })
            .collect())
    }

    async fn store_image(&self, thread_id: &str, data_url: &str) -> Result<String> {
        let bytes = decode_data_url(data_url)?;
        let file_name = format!("{}.png", uuid::Uuid::new_v4());
        self.images.save(thread_id, &file_name, bytes).await?;
        Ok(image_url(&self.config.public_base_url, thread_id, &file_name))
    }

    async fn save_user_message(
        &self,
        user: &ChatUser,
        thread: &Thread,
        prompt: &UserPrompt,
        image_link: Option<String>,
    ) -> Result<StoredMessage> {
        let mut message = StoredMessage::new(&thread.id, &user.id, MessageRole::User, &prompt.message)
            .with_name(&user.name)
            .with_model_type(prompt.model_type.as_str());
        if let Some(link) = image_link {
            message = message.with_image(link);
        }
        self.persistence.save_message(message.clone()).await?;
        Ok(message)
    }

    /// Bump `last_message_at`, naming the thread from its first message
    async fn record_activity(
        &self,
        mut thread: Thread,
        content: &str,
        message: &StoredMessage,
    ) -> Result<Thread> {
        thread.last_message_at = message.created_at;

        if thread.has_default_name() && !content.trim().is_empty() {
            thread.name = prompts::thread_title(content);
            self.persistence.update_thread(&thread).await?;
        } else {
            self.persistence
                .touch_thread(&thread.user_id, &thread.id, message.created_at)
                .await?;
        }
        Ok(thread)
    }

    fn base_options(model_type: ModelType) -> ChatOptions {
        ChatOptions::new().reasoning_model(model_type == ModelType::Reasoning)
    }

    fn multimodal_stream(
        &self,
        model_type: ModelType,
        persona: &str,
        message: &str,
        image_data_url: &str,
    ) -> FragmentStream {
        let profile = self.profile(model_type);
        let messages = vec![
            prompts::instructions(
                model_type,
                &format!("{}{}", persona, prompts::MULTIMODAL_INSTRUCTION),
            ),
            prompts::multimodal_message(message, image_data_url),
        ];
        let request = ChatRequest::new(&profile.deployment, messages).with_options(
            Self::base_options(model_type).max_tokens(self.config.multimodal_max_tokens),
        );
        completion_fragments(Arc::clone(&profile.client), request)
    }

    async fn rag_stream(
        &self,
        model_type: ModelType,
        user: &ChatUser,
        thread: &Thread,
        persona: &str,
        history: Vec<StoredMessage>,
        question: &str,
    ) -> FragmentStream {
        let citations = match self
            .retriever
            .search(&user.id, &thread.id, question, self.config.rag_top_k)
            .await
        {
            Ok(citations) => citations,
            Err(e) => {
                tracing::warn!(thread_id = %thread.id, error = %e, "Similarity search failed, answering without documents");
                Vec::new()
            }
        };

        let profile = self.profile(model_type);
        let mut messages = vec![prompts::instructions(model_type, persona)];
        messages.extend(prompts::history_messages(&history));
        messages.push(Message::human(prompts::rag_user_message(&citations, question)));

        let request = ChatRequest::new(&profile.deployment, messages)
            .with_options(Self::base_options(model_type));
        completion_fragments(Arc::clone(&profile.client), request)
    }

    fn extensions_stream(
        &self,
        model_type: ModelType,
        thread: &Thread,
        persona: &str,
        history: Vec<StoredMessage>,
        extensions: &[Extension],
        message: &str,
    ) -> FragmentStream {
        let steps: String = extensions
            .iter()
            .map(|extension| format!(" {} \n", extension.execution_steps))
            .collect();

        let profile = self.profile(model_type);
        let mut messages = vec![prompts::instructions(
            model_type,
            &format!("{}\n{}", persona, steps),
        )];
        messages.extend(prompts::history_messages(&history));
        messages.push(Message::human(message));

        let registry = self.tool_registry(thread, extensions);
        let request = ChatRequest::new(&profile.deployment, messages)
            .with_options(Self::base_options(model_type));

        ToolRunner::new(
            Arc::clone(&profile.client),
            Arc::new(registry),
            self.config.max_tool_iterations,
        )
        .run(request)
    }

    /// Default tools plus every enabled extension function
    fn tool_registry(&self, thread: &Thread, extensions: &[Extension]) -> ToolRegistry {
        let mut registry = ToolRegistry::new();

        if let (Some(client), Some(deployment)) = (&self.image_client, &self.config.image_deployment) {
            registry.register(Arc::new(CreateImageTool::new(
                Arc::clone(client),
                deployment.clone(),
                Arc::clone(&self.images),
                thread.id.clone(),
                self.config.public_base_url.clone(),
            )));
        }

        for extension in extensions {
            registry.register_extension(extension, &self.http, self.config.extension_response_limit);
        }

        registry
    }
}

/// Open the completion lazily so connection failures surface inside the stream
fn completion_fragments(client: Arc<dyn ChatClient>, request: ChatRequest) -> FragmentStream {
    let opened = futures::stream::once(async move { client.chat_stream(request).await });
    opened.map_ok(from_event_stream).try_flatten().boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_priority() {
        assert_eq!(select_strategy(true, 3), ChatStrategy::Multimodal);
        assert_eq!(select_strategy(true, 0), ChatStrategy::Multimodal);
        assert_eq!(select_strategy(false, 1), ChatStrategy::ChatWithFile);
        assert_eq!(select_strategy(false, 0), ChatStrategy::Extensions);
    }

    #[test]
    fn test_user_prompt_accepts_legacy_field_names() {
        let prompt: UserPrompt = serde_json::from_str(
            r#"{"id":"t1","message":"hi","multimodalImage":"data:image/png;base64,AA==","modelType":"o3_reasoning"}"#,
        )
        .unwrap();
        assert_eq!(prompt.thread_id, "t1");
        assert_eq!(prompt.model_type, ModelType::Reasoning);
        assert!(prompt.image.is_some());

        let prompt: UserPrompt =
            serde_json::from_str(r#"{"thread_id":"t1","message":"hi"}"#).unwrap();
        assert_eq!(prompt.model_type, ModelType::Standard);
        assert!(prompt.image.is_none());
    }
}
