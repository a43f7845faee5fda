mod document;
mod extension;
mod message;
mod thread;

pub use document::{Document, DocumentChunk};
pub use extension::{Extension, ExtensionFunction, ExtensionHeader, HttpMethod};
pub use message::{Message, MessageRole};
pub use thread::{Thread, DEFAULT_THREAD_NAME};
