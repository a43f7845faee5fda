//! Chat turn handling: strategy dispatch, tool execution, document
//! retrieval and the relay that turns response fragments into client events.

pub mod dispatcher;
pub mod error;
pub mod fragment;
pub mod images;
pub mod prompts;
pub mod rag;
pub mod relay;
pub mod tool_runner;
pub mod tools;

pub use dispatcher::{
    select_strategy, ChatDispatcher, ChatStrategy, ChatTurn, ChatUser, DispatcherConfig,
    ModelProfile, ModelType, UserPrompt,
};
pub use error::{ChatError, Result};
pub use fragment::{FinishReason, Fragment, FragmentStream};
pub use images::{FsImageStore, ImageStore, InMemoryImageStore};
pub use rag::{ChunkingConfig, Citation, Retriever};
pub use relay::{run_relay, spawn_relay, ChatEvent, RelayContext, RelayOutcome};
pub use tool_runner::ToolRunner;
pub use tools::{CreateImageTool, HttpExtensionTool, ToolHandler, ToolRegistry};
