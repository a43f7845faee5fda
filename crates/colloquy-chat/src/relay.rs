use std::sync::Arc;

use colloquy_persist::{Message, MessageRole, PersistenceClient};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::fragment::{FinishReason, Fragment, FragmentStream};

const GENERIC_ERROR: &str = "An unexpected error occurred.";
const ABORT_MESSAGE: &str = "Chat aborted by user.";
const EVENT_BUFFER: usize = 256;

/// Outbound event, serialized as the SSE `data` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "response", rename_all = "camelCase")]
pub enum ChatEvent {
    Content(String),
    FunctionCall { name: String, arguments: String },
    FunctionCallResult { name: String, result: String },
    FinalContent(String),
    Abort(String),
    Error(String),
}

impl ChatEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Content(_) => "content",
            Self::FunctionCall { .. } => "functionCall",
            Self::FunctionCallResult { .. } => "functionCallResult",
            Self::FinalContent(_) => "finalContent",
            Self::Abort(_) => "abort",
            Self::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Completed,
    Aborted,
    Failed,
}

/// Where the relay writes the messages it produces
#[derive(Clone)]
pub struct RelayContext {
    pub persistence: Arc<dyn PersistenceClient>,
    pub user_id: String,
    pub thread_id: String,
    /// Name stamped on assistant messages
    pub assistant_name: String,
}

impl RelayContext {
    async fn persist(&self, role: MessageRole, content: &str, name: Option<&str>) -> colloquy_persist::Result<()> {
        let mut message = Message::new(&self.thread_id, &self.user_id, role, content);
        if let Some(name) = name {
            message = message.with_name(name);
        }
        self.persistence.save_message(message).await
    }
}

#[derive(Default)]
struct Accumulator {
    content: String,
    function_name: String,
    function_arguments: String,
}

impl Accumulator {
    fn take_function_call(&mut self) -> (String, String) {
        (
            std::mem::take(&mut self.function_name),
            std::mem::take(&mut self.function_arguments),
        )
    }
}

struct ChannelClosed;

async fn emit(events: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> Result<(), ChannelClosed> {
    events.send(event).await.map_err(|_| ChannelClosed)
}

/// Run the relay on a background task and return its event receiver
pub fn spawn_relay(
    fragments: FragmentStream,
    ctx: RelayContext,
    cancel: CancellationToken,
) -> mpsc::Receiver<ChatEvent> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        let outcome = run_relay(fragments, &ctx, tx, cancel).await;
        tracing::debug!(thread_id = %ctx.thread_id, ?outcome, "Relay finished");
    });

    rx
}

/// Consume fragments in order, forwarding events and persisting the
/// function-call and final assistant messages.
///
/// Cancellation is checked before every fragment. A closed receiver counts
/// as cancellation.
pub async fn run_relay(
    mut fragments: FragmentStream,
    ctx: &RelayContext,
    events: mpsc::Sender<ChatEvent>,
    cancel: CancellationToken,
) -> RelayOutcome {
    let mut acc = Accumulator::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(thread_id = %ctx.thread_id, "Chat stream aborted by caller");
                let _ = emit(&events, ChatEvent::Abort(ABORT_MESSAGE.to_string())).await;
                return RelayOutcome::Aborted;
            }
            next = fragments.next() => next,
        };

        let step = match next {
            Some(Ok(fragment)) => handle_fragment(fragment, &mut acc, ctx, &events).await,
            Some(Err(e)) => Step::Fail(e),
            None if !acc.content.is_empty() => finish_answer(&acc, ctx, &events).await,
            None => Step::Fail(anyhow::anyhow!("Stream ended without a completion signal")),
        };

        match step {
            Step::Continue => {}
            Step::Done => return RelayOutcome::Completed,
            Step::Closed => {
                tracing::info!(thread_id = %ctx.thread_id, "Event receiver dropped, stopping relay");
                return RelayOutcome::Aborted;
            }
            Step::Fail(e) => {
                fail(e, &acc, ctx, &events).await;
                return RelayOutcome::Failed;
            }
        }
    }
}

enum Step {
    Continue,
    Done,
    Closed,
    Fail(anyhow::Error),
}

impl From<ChannelClosed> for Step {
    fn from(_: ChannelClosed) -> Self {
        Step::Closed
    }
}

async fn handle_fragment(
    fragment: Fragment,
    acc: &mut Accumulator,
    ctx: &RelayContext,
    events: &mpsc::Sender<ChatEvent>,
) -> Step {
    match fragment {
        Fragment::Content(delta) => {
            acc.content.push_str(&delta);
            match emit(events, ChatEvent::Content(delta)).await {
                Ok(()) => Step::Continue,
                Err(closed) => closed.into(),
            }
        }
        Fragment::FunctionCall { name, arguments } => {
            if let Some(name) = name {
                acc.function_name = name;
            }
            if let Some(arguments) = arguments {
                acc.function_arguments.push_str(&arguments);
            }
            Step::Continue
        }
        Fragment::FunctionResult { name, result } => {
            match emit(events, ChatEvent::FunctionCallResult { name, result }).await {
                Ok(()) => Step::Continue,
                Err(closed) => closed.into(),
            }
        }
        Fragment::Finished(FinishReason::FunctionCall) => {
            let (name, arguments) = acc.take_function_call();
            if let Err(e) = ctx
                .persist(MessageRole::Function, &arguments, Some(&name))
                .await
            {
                return Step::Fail(e.into());
            }
            match emit(events, ChatEvent::FunctionCall { name, arguments }).await {
                Ok(()) => Step::Continue,
                Err(closed) => closed.into(),
            }
        }
        Fragment::Finished(FinishReason::Stop) | Fragment::Finished(FinishReason::Length) => {
            finish_answer(acc, ctx, events).await
        }
        Fragment::Finished(FinishReason::ContentFilter) => {
            Step::Fail(anyhow::anyhow!("Response blocked by the content filter"))
        }
        Fragment::Finished(FinishReason::Other(reason)) => {
            Step::Fail(anyhow::anyhow!("Unexpected finish reason: {}", reason))
        }
    }
}

async fn finish_answer(
    acc: &Accumulator,
    ctx: &RelayContext,
    events: &mpsc::Sender<ChatEvent>,
) -> Step {
    if let Err(e) = ctx
        .persist(MessageRole::Assistant, &acc.content, Some(ctx.assistant_name.as_str()))
        .await
    {
        tracing::error!(thread_id = %ctx.thread_id, error = %e, "Failed to persist assistant message");
        let _ = emit(events, ChatEvent::Error(GENERIC_ERROR.to_string())).await;
        return Step::Done;
    }
    match emit(events, ChatEvent::FinalContent(acc.content.clone())).await {
        Ok(()) => Step::Done,
        Err(closed) => closed.into(),
    }
}

async fn fail(
    error: anyhow::Error,
    acc: &Accumulator,
    ctx: &RelayContext,
    events: &mpsc::Sender<ChatEvent>,
) {
    tracing::error!(thread_id = %ctx.thread_id, error = %format!("{:#}", error), "Chat stream failed");
    let _ = emit(events, ChatEvent::Error(GENERIC_ERROR.to_string())).await;

    if !acc.content.is_empty() {
        if let Err(e) = ctx
            .persist(MessageRole::Assistant, &acc.content, Some(ctx.assistant_name.as_str()))
            .await
        {
            tracing::error!(thread_id = %ctx.thread_id, error = %e, "Failed to save partial answer after stream error");
        }
    }
}
