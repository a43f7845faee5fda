pub mod document;
pub mod extension;
pub mod message;
pub mod thread;

pub use document::MongoDocumentRepository;
pub use extension::MongoExtensionRepository;
pub use message::MongoMessageRepository;
pub use thread::MongoThreadRepository;
