use std::collections::VecDeque;
use std::pin::Pin;

use anyhow::Result;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Message {
        content: String,
    },

    ToolCall {
        index: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },

    /// `finish_reason` is `None` for the trailing `[DONE]` marker
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    pub role: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCallDelta>>,
    /// Legacy single function call delta
    pub function_call: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub tool_type: Option<String>,
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

impl ChatStreamChunk {
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
    }

    pub fn is_done(&self) -> bool {
        self.choices
            .first()
            .and_then(|c| c.finish_reason.as_ref())
            .is_some()
    }

    pub fn to_stream_events(&self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        // Azure sends a leading chunk with content filter results and no choices
        let Some(choice) = self.choices.first() else {
            return events;
        };

        if let Some(content) = &choice.delta.content {
            if !content.is_empty() {
                events.push(StreamEvent::Message {
                    content: content.clone(),
                });
            }
        }

        if let Some(tool_calls) = &choice.delta.tool_calls {
            for tc in tool_calls {
                events.push(StreamEvent::ToolCall {
                    index: tc.index,
                    id: tc.id.clone(),
                    name: tc.function.as_ref().and_then(|f| f.name.clone()),
                    arguments: tc.function.as_ref().and_then(|f| f.arguments.clone()),
                });
            }
        }

        if let Some(function_call) = &choice.delta.function_call {
            events.push(StreamEvent::ToolCall {
                index: 0,
                id: None,
                name: function_call.name.clone(),
                arguments: function_call.arguments.clone(),
            });
        }

        if let Some(finish_reason) = &choice.finish_reason {
            events.push(StreamEvent::Done {
                finish_reason: Some(finish_reason.clone()),
            });
        }

        events
    }
}

/// Accumulates raw bytes and hands out complete lines
struct LineBuffer {
    buffer: VecDeque<u8>,
}

impl LineBuffer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();

        match String::from_utf8(line_bytes) {
            Ok(line) => Some(Ok(line.trim().to_string())),
            Err(e) => Some(Err(anyhow::anyhow!("Invalid UTF-8 in stream: {}", e))),
        }
    }
}

/// Parse an OpenAI-style chat completions SSE byte stream into events
///
/// Generic over the byte source so it can be fed from `reqwest` or from tests.
pub fn parse_chat_sse_stream<S, B, E>(
    bytes: S,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer = LineBuffer::with_capacity(8192);

        'outer: while let Some(chunk_result) = byte_chunks.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    break;
                }
            };
            buffer.extend(chunk.as_ref());

            while let Some(line_result) = buffer.next_line() {
                let line = match line_result {
                    Ok(line) => line,
                    Err(e) => {
                        yield Err(e);
                        continue;
                    }
                };

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim_start();

                if data == "[DONE]" {
                    yield Ok(StreamEvent::Done { finish_reason: None });
                    break 'outer;
                }

                match serde_json::from_str::<ChatStreamChunk>(data) {
                    Ok(chunk) => {
                        for event in chunk.to_stream_events() {
                            yield Ok(event);
                        }
                    }
                    Err(e) => yield Err(anyhow::anyhow!("Failed to parse chat chunk: {}", e)),
                }
            }
        }
    })
}
