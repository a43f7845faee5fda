pub mod types;
pub mod traits;
pub mod streaming;
pub mod azure_openai;
pub mod config;

pub use traits::{
    ChatClient,
    EmbeddingClient,
    ImageClient,
    LLMClient,
    ChatRequest, ChatResponse, ChatOptions,
    EmbeddingRequest, ImageRequest, GeneratedImage,
    EventStream, TokenUsage,
};

pub use streaming::{StreamEvent, parse_chat_sse_stream};
pub use azure_openai::AzureOpenAIClient;
pub use config::{AzureConfig, ClientFactory};
pub use types::{Message, Content, ContentPart, Tool, ToolCall, ToolChoice};
