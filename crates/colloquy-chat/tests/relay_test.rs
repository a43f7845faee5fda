use std::sync::Arc;

use colloquy_chat::{run_relay, spawn_relay, ChatEvent, FinishReason, Fragment, FragmentStream, RelayContext, RelayOutcome};
use colloquy_persist::{InMemoryPersistence, MessageRole, PersistenceClient};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn context(store: &Arc<InMemoryPersistence>) -> RelayContext {
    RelayContext {
        persistence: store.clone(),
        user_id: "u1".to_string(),
        thread_id: "t1".to_string(),
        assistant_name: "Colloquy".to_string(),
    }
}

fn fragments(items: Vec<anyhow::Result<Fragment>>) -> FragmentStream {
    Box::pin(futures::stream::iter(items))
}

fn content(delta: &str) -> anyhow::Result<Fragment> {
    Ok(Fragment::Content(delta.to_string()))
}

fn call_delta(name: Option<&str>, arguments: &str) -> anyhow::Result<Fragment> {
    Ok(Fragment::FunctionCall {
        name: name.map(str::to_string),
        arguments: Some(arguments.to_string()),
    })
}

fn finished(reason: FinishReason) -> anyhow::Result<Fragment> {
    Ok(Fragment::Finished(reason))
}

async fn relay_all(
    items: Vec<anyhow::Result<Fragment>>,
    store: &Arc<InMemoryPersistence>,
) -> (RelayOutcome, Vec<ChatEvent>) {
    let (tx, mut rx) = mpsc::channel(64);
    let outcome = run_relay(fragments(items), &context(store), tx, CancellationToken::new()).await;

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (outcome, events)
}

#[tokio::test]
async fn test_stop_persists_one_assistant_message() {
    let store = Arc::new(InMemoryPersistence::new());
    let (outcome, events) = relay_all(
        vec![content("Hel"), content("lo"), finished(FinishReason::Stop)],
        &store,
    )
    .await;

    assert_eq!(outcome, RelayOutcome::Completed);
    assert_eq!(
        events,
        vec![
            ChatEvent::Content("Hel".to_string()),
            ChatEvent::Content("lo".to_string()),
            ChatEvent::FinalContent("Hello".to_string()),
        ]
    );

    let saved = store.get_messages("u1", "t1").await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].role, MessageRole::Assistant);
    assert_eq!(saved[0].content, "Hello");
    assert_eq!(saved[0].name.as_deref(), Some("Colloquy"));
}

#[tokio::test]
async fn test_length_finishes_like_stop() {
    let store = Arc::new(InMemoryPersistence::new());
    let (outcome, events) =
        relay_all(vec![content("cut"), finished(FinishReason::Length)], &store).await;

    assert_eq!(outcome, RelayOutcome::Completed);
    assert_eq!(events.last(), Some(&ChatEvent::FinalContent("cut".to_string())));
}

#[tokio::test]
async fn test_sequential_function_calls_reset_accumulators() {
    let store = Arc::new(InMemoryPersistence::new());
    let (outcome, events) = relay_all(
        vec![
            call_delta(Some("lookup"), "{\"q\""),
            call_delta(None, ":1}"),
            finished(FinishReason::FunctionCall),
            Ok(Fragment::FunctionResult {
                name: "lookup".to_string(),
                result: "42".to_string(),
            }),
            call_delta(Some("weather"), "{}"),
            finished(FinishReason::FunctionCall),
            content("done"),
            finished(FinishReason::Stop),
        ],
        &store,
    )
    .await;

    assert_eq!(outcome, RelayOutcome::Completed);
    assert_eq!(
        events,
        vec![
            ChatEvent::FunctionCall {
                name: "lookup".to_string(),
                arguments: "{\"q\":1}".to_string(),
            },
            ChatEvent::FunctionCallResult {
                name: "lookup".to_string(),
                result: "42".to_string(),
            },
            ChatEvent::FunctionCall {
                name: "weather".to_string(),
                arguments: "{}".to_string(),
            },
            ChatEvent::Content("done".to_string()),
            ChatEvent::FinalContent("done".to_string()),
        ]
    );

    let saved = store.get_messages("u1", "t1").await.unwrap();
    let summary: Vec<(MessageRole, Option<&str>, &str)> = saved
        .iter()
        .map(|m| (m.role, m.name.as_deref(), m.content.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (MessageRole::Function, Some("lookup"), "{\"q\":1}"),
            (MessageRole::Function, Some("weather"), "{}"),
            (MessageRole::Assistant, Some("Colloquy"), "done"),
        ]
    );
}

#[tokio::test]
async fn test_error_keeps_partial_answer() {
    let store = Arc::new(InMemoryPersistence::new());
    let (outcome, events) = relay_all(
        vec![content("partial"), Err(anyhow::anyhow!("connection reset"))],
        &store,
    )
    .await;

    assert_eq!(outcome, RelayOutcome::Failed);
    assert_eq!(events.len(), 2);
    match &events[1] {
        ChatEvent::Error(message) => assert!(!message.contains("connection reset")),
        other => panic!("expected error event, got {:?}", other),
    }

    let saved = store.get_messages("u1", "t1").await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].content, "partial");
    assert_eq!(saved[0].name.as_deref(), Some("Colloquy"));
}

#[tokio::test]
async fn test_content_filter_is_a_failure() {
    let store = Arc::new(InMemoryPersistence::new());
    let (outcome, events) =
        relay_all(vec![finished(FinishReason::ContentFilter)], &store).await;

    assert_eq!(outcome, RelayOutcome::Failed);
    assert!(matches!(events.as_slice(), [ChatEvent::Error(_)]));
    assert!(store.get_messages("u1", "t1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_end_without_terminal_signal() {
    let store = Arc::new(InMemoryPersistence::new());
    let (outcome, events) = relay_all(vec![content("all of it")], &store).await;
    assert_eq!(outcome, RelayOutcome::Completed);
    assert_eq!(events.last(), Some(&ChatEvent::FinalContent("all of it".to_string())));

    let empty_store = Arc::new(InMemoryPersistence::new());
    let (outcome, events) = relay_all(Vec::new(), &empty_store).await;
    assert_eq!(outcome, RelayOutcome::Failed);
    assert!(matches!(events.as_slice(), [ChatEvent::Error(_)]));
    assert!(empty_store.get_messages("u1", "t1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_abort_stops_without_persisting() {
    let store = Arc::new(InMemoryPersistence::new());
    let (fragment_tx, fragment_rx) = futures::channel::mpsc::unbounded::<anyhow::Result<Fragment>>();
    let cancel = CancellationToken::new();
    let mut events = spawn_relay(Box::pin(fragment_rx), context(&store), cancel.clone());

    fragment_tx.unbounded_send(content("Hel")).unwrap();
    assert_eq!(events.recv().await, Some(ChatEvent::Content("Hel".to_string())));

    cancel.cancel();
    let _ = fragment_tx.unbounded_send(content("lo"));
    let _ = fragment_tx.unbounded_send(finished(FinishReason::Stop));

    let mut rest = Vec::new();
    while let Some(event) = events.recv().await {
        rest.push(event);
    }

    assert!(matches!(rest.as_slice(), [ChatEvent::Abort(_)]));
    assert!(store.get_messages("u1", "t1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dropped_receiver_counts_as_cancellation() {
    let store = Arc::new(InMemoryPersistence::new());
    let (tx, rx) = mpsc::channel(4);
    drop(rx);

    let outcome = run_relay(
        fragments(vec![content("x"), finished(FinishReason::Stop)]),
        &context(&store),
        tx,
        CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome, RelayOutcome::Aborted);
    assert!(store.get_messages("u1", "t1").await.unwrap().is_empty());
}

#[test]
fn test_event_payload_shape() {
    let event = ChatEvent::FunctionCall {
        name: "lookup".to_string(),
        arguments: "{}".to_string(),
    };
    assert_eq!(event.name(), "functionCall");
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        serde_json::json!({
            "type": "functionCall",
            "response": { "name": "lookup", "arguments": "{}" }
        })
    );
    assert_eq!(
        serde_json::to_value(ChatEvent::FinalContent("hi".to_string())).unwrap(),
        serde_json::json!({ "type": "finalContent", "response": "hi" })
    );
}
