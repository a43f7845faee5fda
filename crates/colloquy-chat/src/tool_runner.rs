use std::collections::BTreeMap;
use std::sync::Arc;

use colloquy_llm::{ChatClient, ChatRequest, Message, StreamEvent, ToolCall, ToolChoice};
use futures::{Stream, StreamExt};

use crate::fragment::{FinishReason, Fragment, FragmentStream};
use crate::tools::ToolRegistry;

#[derive(Default)]
struct PendingCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Drives completions with function calling until the model stops calling tools
pub struct ToolRunner {
    client: Arc<dyn ChatClient>,
    registry: Arc<ToolRegistry>,
    max_iterations: usize,
}

impl ToolRunner {
    pub fn new(client: Arc<dyn ChatClient>, registry: Arc<ToolRegistry>, max_iterations: usize) -> Self {
        Self {
            client,
            registry,
            max_iterations,
        }
    }

    /// Stream fragments across every completion of the conversation.
    ///
    /// Each finished tool call is emitted as one `FunctionCall` delta followed
    /// by `Finished(FunctionCall)` and a `FunctionResult`.
    pub fn run(self, request: ChatRequest) -> FragmentStream {
        Box::pin(self.fragments(request))
    }

    fn fragments(self, request: ChatRequest) -> impl Stream<Item = anyhow::Result<Fragment>> + Send {
        async_stream::try_stream! {
            let ChatRequest { model, mut messages, mut options } = request;
            if !self.registry.is_empty() {
                options.tools = Some(self.registry.definitions());
                options.tool_choice.get_or_insert(ToolChoice::auto());
            }

            let mut iteration = 0;
            loop {
                if iteration >= self.max_iterations {
                    Err::<(), _>(anyhow::anyhow!(
                        "Max tool iterations ({}) reached",
                        self.max_iterations
                    ))?;
                }
                iteration += 1;

                let completion = ChatRequest::new(model.clone(), messages.clone())
                    .with_options(options.clone());
                let mut events = self.client.chat_stream(completion).await?;

                let mut calls: BTreeMap<u32, PendingCall> = BTreeMap::new();
                let mut finish: Option<FinishReason> = None;

                while let Some(event) = events.next().await {
                    match event? {
                        StreamEvent::Message { content } => yield Fragment::Content(content),
                        StreamEvent::ToolCall { index, id, name, arguments } => {
                            let call = calls.entry(index).or_default();
                            if id.is_some() {
                                call.id = id;
                            }
                            if let Some(name) = name {
                                call.name.push_str(&name);
                            }
                            if let Some(arguments) = arguments {
                                call.arguments.push_str(&arguments);
                            }
                        }
                        StreamEvent::Done { finish_reason: Some(reason) } => {
                            finish = Some(FinishReason::parse(&reason));
                        }
                        StreamEvent::Done { finish_reason: None } => {}
                    }
                }

                match finish {
                    Some(FinishReason::FunctionCall) if !calls.is_empty() => {
                        let tool_calls: Vec<ToolCall> = calls
                            .into_values()
                            .map(|call| {
                                let id = call
                                    .id
                                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                                ToolCall::function(id, call.name, call.arguments)
                            })
                            .collect();

                        messages.push(Message::ai_with_tools(tool_calls.clone()));

                        for call in tool_calls {
                            let name = call.function.name.clone();
                            let arguments = call.function.arguments.clone();

                            yield Fragment::FunctionCall {
                                name: Some(name.clone()),
                                arguments: Some(arguments.clone()),
                            };
                            yield Fragment::Finished(FinishReason::FunctionCall);

                            let result = self.registry.execute(&name, &arguments).await;
                            yield Fragment::FunctionResult {
                                name: name.clone(),
                                result: result.clone(),
                            };

                            messages.push(Message::tool_result(call.id, result));
                        }
                    }
                    Some(reason) => {
                        yield Fragment::Finished(reason);
                        break;
                    }
                    None => break,
                }
            }
        }
    }
}
