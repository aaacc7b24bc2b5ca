use std::sync::Arc;

use labsync_core::{Config, ConfirmationStore, ConfirmationSync, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn ConfirmationStore>,
    sync: Arc<ConfirmationSync>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ConfirmationStore>,
        sync: Arc<ConfirmationSync>,
    ) -> Self {
        Self {
            config,
            store,
            sync,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn ConfirmationStore {
        self.store.as_ref()
    }

    pub fn sync(&self) -> &ConfirmationSync {
        &self.sync
    }
}
