//! Application state shared across handlers.

use crate::counter::CounterService;
use std::sync::Arc;
use tally_core::config::AppConfig;
use tally_metadata::MetadataStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Counter service bound to the configured counter name.
    pub counter: CounterService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, metadata: Arc<dyn MetadataStore>) -> Self {
        let counter = CounterService::new(metadata.clone(), config.server.counter_name.trim());
        Self {
            config: Arc::new(config),
            metadata,
            counter,
        }
    }
}
