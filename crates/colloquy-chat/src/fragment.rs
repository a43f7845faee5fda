use std::pin::Pin;

use colloquy_llm::{EventStream, StreamEvent};
use futures::{Stream, StreamExt};

/// Why a completion ended, as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    /// `function_call` or `tool_calls`
    FunctionCall,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn parse(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "function_call" | "tool_calls" => Self::FunctionCall,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One incremental piece of a generated response
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Text delta
    Content(String),

    /// Function-call delta; name and argument text arrive in pieces
    FunctionCall {
        name: Option<String>,
        arguments: Option<String>,
    },

    /// Output of a function executed between completions
    FunctionResult { name: String, result: String },

    Finished(FinishReason),
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = anyhow::Result<Fragment>> + Send>>;

/// Map a provider event stream onto fragments, dropping the `[DONE]` marker
pub fn from_event_stream(events: EventStream) -> FragmentStream {
    Box::pin(events.filter_map(|event| async move {
        match event {
            Ok(StreamEvent::Message { content }) => Some(Ok(Fragment::Content(content))),
            Ok(StreamEvent::ToolCall { name, arguments, .. }) => {
                Some(Ok(Fragment::FunctionCall { name, arguments }))
            }
            Ok(StreamEvent::Done { finish_reason: Some(reason) }) => {
                Some(Ok(Fragment::Finished(FinishReason::parse(&reason))))
            }
            Ok(StreamEvent::Done { finish_reason: None }) => None,
            Err(e) => Some(Err(e)),
        }
    }))
}
