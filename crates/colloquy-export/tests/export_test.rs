use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use colloquy_export::{
    assemble, sha256_hex, ExportError, ExportFormat, ExportRequest, ExportService,
    PartitionResolver,
};
use colloquy_persist::{Document, InMemoryPersistence, Message, MessageRole, PersistenceClient, Thread};
use serde_json::Value;

fn keys(value: &Value) -> BTreeSet<&str> {
    value
        .as_object()
        .map(|object| object.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

fn key_set<'a>(names: &[&'a str]) -> BTreeSet<&'a str> {
    names.iter().copied().collect()
}

fn request(email: Option<&str>, legacy: Option<&str>, format: ExportFormat) -> ExportRequest {
    ExportRequest {
        user_email: email.map(str::to_string),
        legacy_user_id: legacy.map(str::to_string),
        format,
    }
}

async fn seed_thread(store: &InMemoryPersistence, partition: &str, messages: usize) -> Thread {
    let thread = store
        .create_thread(Thread::new(partition, "Ada"))
        .await
        .unwrap();
    let base = Utc::now() - Duration::minutes(5);
    for i in 0..messages {
        let role = if i % 2 == 0 { MessageRole::User } else { MessageRole::Assistant };
        let mut message = Message::new(&thread.id, partition, role, format!("m{}", i));
        message.created_at = base + Duration::seconds(i as i64);
        store.save_message(message).await.unwrap();
    }
    thread
}

#[tokio::test]
async fn test_resolver_falls_through_to_lowercase_hash() {
    let store = Arc::new(InMemoryPersistence::new());
    let lower = sha256_hex("user@example.com");
    seed_thread(&store, &lower, 2).await;

    let resolution = PartitionResolver::new(store.clone())
        .resolve(Some("User@Example.com"), None)
        .await
        .unwrap();

    assert_eq!(
        resolution.candidates,
        vec![sha256_hex("User@Example.com"), lower.clone()]
    );
    assert_eq!(resolution.partition_key, lower);
    assert_eq!(resolution.data.threads.len(), 1);
    assert_eq!(resolution.data.messages.len(), 2);
}

#[tokio::test]
async fn test_resolver_prefers_first_candidate_with_content() {
    let store = Arc::new(InMemoryPersistence::new());
    let direct = sha256_hex("User@Example.com");
    seed_thread(&store, &direct, 1).await;
    seed_thread(&store, &sha256_hex("user@example.com"), 1).await;

    let resolution = PartitionResolver::new(store.clone())
        .resolve(Some("User@Example.com"), None)
        .await
        .unwrap();
    assert_eq!(resolution.partition_key, direct);
}

#[tokio::test]
async fn test_resolver_returns_last_candidate_when_all_empty() {
    let store = Arc::new(InMemoryPersistence::new());
    let resolution = PartitionResolver::new(store.clone())
        .resolve(Some("User@Example.com"), Some("legacy-42"))
        .await
        .unwrap();

    assert_eq!(resolution.candidates.len(), 3);
    assert_eq!(resolution.partition_key, "legacy-42");
    assert!(!resolution.data.has_content());
}

#[tokio::test]
async fn test_resolver_rejects_blank_identity() {
    let store = Arc::new(InMemoryPersistence::new());
    let result = PartitionResolver::new(store.clone())
        .resolve(Some("  "), Some(""))
        .await;
    assert!(matches!(result, Err(ExportError::Resolution(_))));
}

#[tokio::test]
async fn test_document_only_thread_is_content() {
    let store = Arc::new(InMemoryPersistence::new());
    let partition = sha256_hex("user@example.com");
    let thread = seed_thread(&store, &partition, 0).await;
    store
        .save_document(Document::new(&thread.id, &partition, "notes.txt"))
        .await
        .unwrap();

    let document = ExportService::new(store.clone())
        .export(request(Some("user@example.com"), None, ExportFormat::Raw))
        .await
        .unwrap();

    assert_eq!(document.file_name, format!("threads-{}.json", partition));
    let bundle = &document.body["threads"][0];
    assert_eq!(bundle["messages"].as_array().unwrap().len(), 0);
    assert_eq!(bundle["documents"][0]["name"], "notes.txt");
    assert_eq!(document.body["legacyUserId"], partition.as_str());
    assert_eq!(document.body["userId"], "user@example.com");
}

#[test]
fn test_assemble_sorts_and_counts_orphans() {
    let first = Thread::new("p", "Ada");
    let second = Thread::new("p", "Ada");
    let now = Utc::now();

    let mut late = Message::new(&first.id, "p", MessageRole::Assistant, "late");
    late.created_at = now + Duration::seconds(10);
    let mut tie_a = Message::new(&first.id, "p", MessageRole::User, "tie-a");
    tie_a.created_at = now;
    let mut tie_b = Message::new(&first.id, "p", MessageRole::User, "tie-b");
    tie_b.created_at = now;
    let orphan = Message::new("gone", "p", MessageRole::User, "orphan");
    let stray_document = Document::new("gone", "p", "stray.txt");

    let assembly = assemble(
        vec![first.clone(), second.clone()],
        vec![late, tie_a, orphan, tie_b],
        vec![stray_document],
    );

    assert_eq!(assembly.bundles.len(), 2);
    assert_eq!(assembly.bundles[0].thread.id, first.id);
    let contents: Vec<&str> = assembly.bundles[0]
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["tie-a", "tie-b", "late"]);
    assert!(assembly.bundles[1].messages.is_empty());
    assert!(assembly.bundles[1].documents.is_empty());

    let placed: usize = assembly.bundles.iter().map(|b| b.messages.len()).sum();
    assert_eq!(placed + assembly.orphaned_messages, 4);
    assert_eq!(assembly.orphaned_messages, 1);
    assert_eq!(assembly.orphaned_documents, 1);
}

#[tokio::test]
async fn test_portal_export_shape() {
    let store = Arc::new(InMemoryPersistence::new());
    let partition = sha256_hex("user@example.com");
    let thread = seed_thread(&store, &partition, 2).await;
    let notes = Document::new(&thread.id, &partition, "notes.txt");
    store.save_document(notes.clone()).await.unwrap();
    let stored = store.get_messages(&partition, &thread.id).await.unwrap();

    let document = ExportService::new(store.clone())
        .export(request(Some("user@example.com"), None, ExportFormat::Portal))
        .await
        .unwrap();

    assert_eq!(document.file_name, format!("threads-portal-{}.json", partition));
    let body = &document.body;
    assert_eq!(keys(body), key_set(&["user", "threads"]));
    assert_eq!(keys(&body["user"]), key_set(&["email", "legacyUserId"]));
    assert_eq!(body["user"]["email"], "user@example.com");
    assert_eq!(body["user"]["legacyUserId"], partition.as_str());

    let exported = &body["threads"][0];
    assert_eq!(
        keys(exported),
        key_set(&[
            "id",
            "userId",
            "name",
            "createdAt",
            "lastMessageAt",
            "personaMessage",
            "personaMessageTitle",
            "extension",
            "metadata",
            "messages",
            "documents",
        ])
    );
    assert_eq!(exported["userId"], "user@example.com");
    assert_eq!(exported["name"], "New Chat");
    assert_eq!(
        exported["metadata"],
        serde_json::json!({ "legacyTranscript": true, "sourceLegacyUserId": partition })
    );

    let messages = exported["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(
        keys(&messages[0]),
        key_set(&["id", "threadId", "index", "role", "content", "createdAt", "metadata"])
    );
    for (index, message) in messages.iter().enumerate() {
        assert_eq!(message["index"], index);
        assert_eq!(message["id"], stored[index].id.as_str());
        assert_eq!(message["threadId"], thread.id.as_str());
        assert_eq!(
            message["metadata"],
            serde_json::json!({
                "legacyTranscript": true,
                "sourceThreadId": thread.id,
                "sourceMessageId": stored[index].id,
            })
        );
    }
    assert_eq!(messages[0]["content"], "m0");
    assert_eq!(messages[1]["content"], "m1");

    let exported_document = &exported["documents"][0];
    assert_eq!(keys(exported_document), key_set(&["id", "name", "createdAt", "metadata"]));
    assert_eq!(exported_document["id"], notes.id.as_str());
    assert_eq!(
        exported_document["metadata"],
        serde_json::json!({ "legacyTranscript": true, "sourceThreadId": thread.id })
    );
}

#[tokio::test]
async fn test_portal_message_carries_optional_fields() {
    let store = Arc::new(InMemoryPersistence::new());
    let partition = sha256_hex("user@example.com");
    let thread = seed_thread(&store, &partition, 0).await;
    let message = Message::new(&thread.id, &partition, MessageRole::User, "look")
        .with_name("Ada")
        .with_image("https://chat.example.com/api/images?t=t1&img=a.png")
        .with_model_type("reasoning");
    store.save_message(message).await.unwrap();

    let document = ExportService::new(store.clone())
        .export(request(Some("user@example.com"), None, ExportFormat::Portal))
        .await
        .unwrap();

    let exported = &document.body["threads"][0]["messages"][0];
    assert_eq!(exported["name"], "Ada");
    assert_eq!(
        exported["multiModalImage"],
        "https://chat.example.com/api/images?t=t1&img=a.png"
    );
    assert_eq!(exported["modelType"], "reasoning");
}

#[tokio::test]
async fn test_raw_export_uses_stored_record_keys() {
    let store = Arc::new(InMemoryPersistence::new());
    let partition = sha256_hex("user@example.com");
    let thread = seed_thread(&store, &partition, 1).await;
    store
        .save_document(Document::new(&thread.id, &partition, "notes.txt"))
        .await
        .unwrap();

    let document = ExportService::new(store.clone())
        .export(request(Some("user@example.com"), None, ExportFormat::Raw))
        .await
        .unwrap();

    let body = &document.body;
    assert_eq!(keys(body), key_set(&["userId", "legacyUserId", "threads"]));

    let bundle = &body["threads"][0];
    assert_eq!(keys(bundle), key_set(&["thread", "messages", "documents"]));
    assert_eq!(
        keys(&bundle["thread"]),
        key_set(&[
            "id",
            "userId",
            "userName",
            "name",
            "createdAt",
            "lastMessageAt",
            "personaMessage",
            "personaMessageTitle",
            "extension",
            "bookmarked",
            "isDeleted",
        ])
    );
    assert_eq!(
        keys(&bundle["messages"][0]),
        key_set(&["id", "threadId", "userId", "role", "content", "createdAt", "isDeleted"])
    );
    assert_eq!(bundle["messages"][0]["threadId"], thread.id.as_str());
    assert_eq!(
        keys(&bundle["documents"][0]),
        key_set(&["id", "chatThreadId", "userId", "name", "createdAt", "isDeleted"])
    );
    assert_eq!(bundle["documents"][0]["chatThreadId"], thread.id.as_str());
}

#[tokio::test]
async fn test_portal_requires_email() {
    let store = Arc::new(InMemoryPersistence::new());
    let result = ExportService::new(store.clone())
        .export(request(None, Some("legacy-42"), ExportFormat::Portal))
        .await;
    assert!(matches!(result, Err(ExportError::Validation(_))));
}

#[tokio::test]
async fn test_soft_deleted_threads_are_not_exported() {
    let store = Arc::new(InMemoryPersistence::new());
    let partition = sha256_hex("user@example.com");
    let kept = seed_thread(&store, &partition, 1).await;
    let deleted = seed_thread(&store, &partition, 1).await;
    store.soft_delete_thread(&partition, &deleted.id).await.unwrap();

    let document = ExportService::new(store.clone())
        .export(request(Some("user@example.com"), None, ExportFormat::Raw))
        .await
        .unwrap();

    let threads = document.body["threads"].as_array().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0]["thread"]["id"], kept.id.as_str());
}
