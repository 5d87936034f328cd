use std::sync::Arc;

use crate::config::Config;
use crate::transfer::DocumentTransfer;
use crate::workflow::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Collaborator client. `HttpTransferClient` in production.
    pub transfer: Arc<dyn DocumentTransfer>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, transfer: Arc<dyn DocumentTransfer>) -> Self {
        Self {
            config,
            transfer,
            sessions: SessionStore::new(),
        }
    }
}
