use std::collections::HashMap;

use colloquy_persist::{Document, Message, Thread};

/// One thread with its messages in creation order and its documents
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadBundle {
    pub thread: Thread,
    pub messages: Vec<Message>,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    pub bundles: Vec<ThreadBundle>,
    /// Messages whose thread is not among the inputs
    pub orphaned_messages: usize,
    pub orphaned_documents: usize,
}

/// Group messages and documents under their threads, keeping thread order.
///
/// Messages are sorted by `created_at` with a stable sort, so records sharing
/// a timestamp keep their input order. Documents keep input order.
pub fn assemble(threads: Vec<Thread>, messages: Vec<Message>, documents: Vec<Document>) -> Assembly {
    let mut messages_by_thread: HashMap<String, Vec<Message>> = HashMap::new();
    for message in messages {
        messages_by_thread
            .entry(message.thread_id.clone())
            .or_default()
            .push(message);
    }

    let mut documents_by_thread: HashMap<String, Vec<Document>> = HashMap::new();
    for document in documents {
        documents_by_thread
            .entry(document.thread_id.clone())
            .or_default()
            .push(document);
    }

    let bundles = threads
        .into_iter()
        .map(|thread| {
            let mut messages = messages_by_thread.remove(&thread.id).unwrap_or_default();
            messages.sort_by_key(|m| m.created_at);
            let documents = documents_by_thread.remove(&thread.id).unwrap_or_default();
            ThreadBundle {
                thread,
                messages,
                documents,
            }
        })
        .collect();

    Assembly {
        bundles,
        orphaned_messages: messages_by_thread.values().map(Vec::len).sum(),
        orphaned_documents: documents_by_thread.values().map(Vec::len).sum(),
    }
}

impl Assembly {
    pub fn has_orphans(&self) -> bool {
        self.orphaned_messages > 0 || self.orphaned_documents > 0
    }
}
