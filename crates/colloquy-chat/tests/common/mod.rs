#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use colloquy_llm::{
    ChatClient, ChatRequest, ChatResponse, EmbeddingClient, EmbeddingRequest, EventStream,
    StreamEvent,
};

/// Chat client that replays scripted completions and records every request
#[derive(Default)]
pub struct ScriptedChatClient {
    responses: Mutex<VecDeque<Vec<StreamEvent>>>,
    repeat_last: Option<Vec<StreamEvent>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatClient {
    pub fn new(responses: Vec<Vec<StreamEvent>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            repeat_last: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answer every request with the same completion
    pub fn repeating(response: Vec<StreamEvent>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            repeat_last: Some(response),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn recorded(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        anyhow::bail!("non-streaming chat is not scripted")
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        self.requests.lock().unwrap().push(request);
        let events = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat_last.clone())
            .ok_or_else(|| anyhow::anyhow!("no scripted response left"))?;
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }
}

/// Embeds every input as the same unit vector
pub struct FixedEmbeddings;

#[async_trait]
impl EmbeddingClient for FixedEmbeddings {
    async fn embed(&self, request: EmbeddingRequest) -> Result<Vec<Vec<f32>>> {
        Ok(request.input.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

pub fn text(content: &str) -> StreamEvent {
    StreamEvent::Message {
        content: content.to_string(),
    }
}

pub fn done(reason: &str) -> StreamEvent {
    StreamEvent::Done {
        finish_reason: Some(reason.to_string()),
    }
}

pub fn tool_delta(id: Option<&str>, name: Option<&str>, arguments: &str) -> StreamEvent {
    StreamEvent::ToolCall {
        index: 0,
        id: id.map(str::to_string),
        name: name.map(str::to_string),
        arguments: Some(arguments.to_string()),
    }
}
