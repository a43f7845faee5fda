use std::sync::Arc;

use colloquy_chat::{ChatDispatcher, ImageStore, Retriever};
use colloquy_export::ExportService;
use colloquy_persist::PersistenceClient;

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// Clients are built once at startup and shared through `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persistence: Arc<dyn PersistenceClient>,
    pub dispatcher: Arc<ChatDispatcher>,
    pub retriever: Arc<Retriever>,
    pub images: Arc<dyn ImageStore>,
    pub exporter: Arc<ExportService>,
}

impl AppState {
    pub fn new(
        config: Config,
        persistence: Arc<dyn PersistenceClient>,
        dispatcher: ChatDispatcher,
        retriever: Arc<Retriever>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let exporter = ExportService::new(persistence.clone());
        Self {
            config: Arc::new(config),
            persistence,
            dispatcher: Arc::new(dispatcher),
            retriever,
            images,
            exporter: Arc::new(exporter),
        }
    }
}
