//! Application state for the HTTP server.

use std::sync::Arc;

use crate::accounting::AccountingConfig;
use crate::db::repository::FullRepository;
use crate::services::DigestService;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn FullRepository>,
    /// Digest and execution-config service
    pub digests: Arc<DigestService>,
    /// Time accounting configuration
    pub accounting: AccountingConfig,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        digests: Arc<DigestService>,
        accounting: AccountingConfig,
    ) -> Self {
        Self {
            repository,
            digests,
            accounting,
        }
    }
}
