pub mod dbs;
pub mod error;
pub mod models;
pub mod trait_client;

pub use dbs::InMemoryPersistence;
#[cfg(feature = "mongodb")]
pub use dbs::MongoPersistenceClient;
pub use error::{PersistError, Result};
pub use models::{
    Document, DocumentChunk, Extension, ExtensionFunction, ExtensionHeader, HttpMethod, Message,
    MessageRole, Thread, DEFAULT_THREAD_NAME,
};
pub use trait_client::PersistenceClient;
