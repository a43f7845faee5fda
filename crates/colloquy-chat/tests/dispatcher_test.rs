mod common;

use std::sync::Arc;

use colloquy_chat::{
    ChatDispatcher, ChatError, ChatStrategy, ChatUser, ChunkingConfig, DispatcherConfig,
    ImageStore, InMemoryImageStore, ModelProfile, ModelType, Retriever, UserPrompt,
};
use colloquy_chat::prompts::REASONING_PREAMBLE;
use colloquy_llm::Message;
use colloquy_persist::{InMemoryPersistence, MessageRole, PersistenceClient, Thread};
use common::{done, text, FixedEmbeddings, ScriptedChatClient};
use futures::StreamExt;

struct Harness {
    store: Arc<InMemoryPersistence>,
    images: Arc<InMemoryImageStore>,
    standard: Arc<ScriptedChatClient>,
    reasoning: Arc<ScriptedChatClient>,
    retriever: Arc<Retriever>,
    dispatcher: ChatDispatcher,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryPersistence::new());
    let images = Arc::new(InMemoryImageStore::new());
    let standard = ScriptedChatClient::repeating(vec![text("standard answer"), done("stop")]);
    let reasoning = ScriptedChatClient::repeating(vec![text("reasoned answer"), done("stop")]);
    let retriever = Arc::new(Retriever::new(
        Arc::new(FixedEmbeddings),
        "embeddings",
        store.clone(),
        ChunkingConfig::default(),
    ));

    let dispatcher = ChatDispatcher::new(
        ModelProfile::new(standard.clone(), "gpt-4o"),
        ModelProfile::new(reasoning.clone(), "o3"),
        store.clone(),
        retriever.clone(),
        images.clone(),
        DispatcherConfig {
            public_base_url: "https://chat.example.com".to_string(),
            ..DispatcherConfig::default()
        },
    );

    Harness {
        store,
        images,
        standard,
        reasoning,
        retriever,
        dispatcher,
    }
}

fn user() -> ChatUser {
    ChatUser {
        id: "u1".to_string(),
        name: "Ada".to_string(),
    }
}

fn prompt(thread_id: &str, message: &str) -> UserPrompt {
    UserPrompt {
        thread_id: thread_id.to_string(),
        message: message.to_string(),
        image: None,
        model_type: ModelType::Standard,
    }
}

async fn new_thread(store: &InMemoryPersistence) -> Thread {
    store.create_thread(Thread::new("u1", "Ada")).await.unwrap()
}

#[tokio::test]
async fn test_user_message_saved_before_generation() {
    let h = harness();
    let thread = new_thread(&h.store).await;

    let turn = h
        .dispatcher
        .dispatch(&user(), prompt(&thread.id, "What is Rust?"))
        .await
        .unwrap();

    assert_eq!(turn.strategy, ChatStrategy::Extensions);
    assert!(h.standard.recorded().is_empty());

    let saved = h.store.get_messages("u1", &thread.id).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].role, MessageRole::User);
    assert_eq!(saved[0].content, "What is Rust?");
    assert_eq!(saved[0].name.as_deref(), Some("Ada"));
    assert_eq!(saved[0].model_type.as_deref(), Some("standard"));

    let stored_thread = h.store.get_thread("u1", &thread.id).await.unwrap().unwrap();
    assert_eq!(stored_thread.name, "What is Rust?");
    assert_eq!(stored_thread.last_message_at, saved[0].created_at);

    let fragments: Vec<_> = turn.fragments.collect().await;
    assert_eq!(fragments.len(), 2);
    assert_eq!(h.standard.recorded().len(), 1);
}

#[tokio::test]
async fn test_documents_select_chat_with_file() {
    let h = harness();
    let thread = new_thread(&h.store).await;
    h.retriever
        .upload("u1", &thread.id, "notes.txt", "The launch date is March 3rd.")
        .await
        .unwrap();

    let turn = h
        .dispatcher
        .dispatch(&user(), prompt(&thread.id, "When is the launch?"))
        .await
        .unwrap();
    assert_eq!(turn.strategy, ChatStrategy::ChatWithFile);

    let _: Vec<_> = turn.fragments.collect().await;
    let request = &h.standard.recorded()[0];
    assert!(request.options.tools.is_none());

    match request.messages.last().unwrap() {
        Message::Human { content, .. } => {
            let body = content.as_text().unwrap();
            assert!(body.contains("file name: notes.txt"));
            assert!(body.contains("The launch date is March 3rd."));
            assert!(body.contains("When is the launch?"));
        }
        other => panic!("expected augmented user message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_image_beats_documents() {
    let h = harness();
    let thread = new_thread(&h.store).await;
    h.retriever
        .upload("u1", &thread.id, "notes.txt", "irrelevant")
        .await
        .unwrap();

    let mut request = prompt(&thread.id, "What is in this picture?");
    request.image = Some("data:image/png;base64,aGVsbG8=".to_string());

    let turn = h.dispatcher.dispatch(&user(), request).await.unwrap();
    assert_eq!(turn.strategy, ChatStrategy::Multimodal);

    let link = turn.user_message.multimodal_image.clone().unwrap();
    assert!(link.starts_with(&format!(
        "https://chat.example.com/api/images?t={}&img=",
        thread.id
    )));
    let file_name = link.rsplit("img=").next().unwrap();
    assert_eq!(
        h.images.load(&thread.id, file_name).await.unwrap(),
        Some(b"hello".to_vec())
    );

    let _: Vec<_> = turn.fragments.collect().await;
    let sent = &h.standard.recorded()[0];
    assert_eq!(sent.messages.len(), 2);
    assert_eq!(sent.options.max_tokens, Some(4096));
    match &sent.messages[1] {
        Message::Human { content, .. } => assert!(content.has_image()),
        other => panic!("expected multimodal user message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reasoning_model_uses_developer_role() {
    let h = harness();
    let thread = new_thread(&h.store).await;

    let mut request = prompt(&thread.id, "Prove it.");
    request.model_type = ModelType::Reasoning;

    let turn = h.dispatcher.dispatch(&user(), request).await.unwrap();
    let _: Vec<_> = turn.fragments.collect().await;

    assert!(h.standard.recorded().is_empty());
    let sent = &h.reasoning.recorded()[0];
    assert_eq!(sent.model, "o3");
    assert!(sent.options.reasoning_model);
    match &sent.messages[0] {
        Message::Developer { content } => {
            assert!(content.as_text().unwrap().starts_with(REASONING_PREAMBLE));
        }
        other => panic!("expected developer message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_history_is_chronological_and_bounded() {
    let h = harness();
    let thread = new_thread(&h.store).await;
    let base = chrono::Utc::now() - chrono::Duration::minutes(10);
    for i in 0..40 {
        let role = if i % 2 == 0 { MessageRole::User } else { MessageRole::Assistant };
        let mut message = colloquy_persist::Message::new(&thread.id, "u1", role, format!("m{}", i));
        message.created_at = base + chrono::Duration::seconds(i);
        h.store.save_message(message).await.unwrap();
    }

    let turn = h
        .dispatcher
        .dispatch(&user(), prompt(&thread.id, "latest"))
        .await
        .unwrap();
    let _: Vec<_> = turn.fragments.collect().await;

    let sent = &h.standard.recorded()[0];
    // system + 30 history + new user message
    assert_eq!(sent.messages.len(), 32);
    match &sent.messages[1] {
        Message::Human { content, .. } => assert_eq!(content.as_text(), Some("m10")),
        other => panic!("unexpected first history message: {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_thread_is_rejected() {
    let h = harness();
    let result = h.dispatcher.dispatch(&user(), prompt("missing", "hi")).await;
    assert!(matches!(result, Err(ChatError::ThreadNotFound(_))));
    assert!(h.store.list_user_messages("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let h = harness();
    let thread = new_thread(&h.store).await;
    let result = h.dispatcher.dispatch(&user(), prompt(&thread.id, "   ")).await;
    assert!(matches!(result, Err(ChatError::Validation(_))));
}
