mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;

pub use memory::InMemoryPersistence;
#[cfg(feature = "mongodb")]
pub use mongo::MongoPersistenceClient;
