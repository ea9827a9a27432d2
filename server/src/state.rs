use crate::content::ContentStore;
use crate::ws::EventPublisher;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// In-memory workspaces, articles and comments
    pub store: ContentStore,
    /// Realtime event fan-out to every connected session
    pub publisher: EventPublisher,
}

impl AppState {
    pub fn new(publisher: EventPublisher) -> Self {
        Self {
            store: ContentStore::new(),
            publisher,
        }
    }
}
