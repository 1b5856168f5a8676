//! Database module: repository pattern and persistence abstractions.
//!
//! The module is layered the same way as the rest of the system talks to
//! it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application layer (HTTP handlers, server binary)        │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service layer (services/, execution::recorder,          │
//! │  accounting::engine) - business logic                    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository traits (repository/) - abstract interface    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌──────────────────────────────────────────────┐
//!     │             Local repository                  │
//!     │               (in-memory)                     │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! Mutations that touch more than one table (event ingestion, visit
//! insertion) are single repository calls so each backend can make them
//! one transaction.

#[cfg(not(feature = "local-repo"))]
compile_error!("Enable at least one repository backend feature.");

pub mod checksum;
pub mod factory;
pub mod models;
pub mod repo_config;
pub mod repositories;
pub mod repository;

pub use checksum::event_checksum;
pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
pub use repository::{
    AccountingRepository, DigestRepository, ErrorContext, ExecutionRepository, FullRepository,
    ObservationDefinition, ObservationRepository, RepositoryError, RepositoryResult,
};

use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};

/// Global repository instance initialized once per process.
static REPOSITORY: OnceLock<Arc<dyn FullRepository>> = OnceLock::new();

/// Initialize the global repository singleton for the selected backend.
pub fn init_repository() -> Result<()> {
    if REPOSITORY.get().is_some() {
        return Ok(());
    }
    let repo_type = RepositoryConfig::from_default_location()
        .ok()
        .and_then(|c| c.repository_type().ok())
        .unwrap_or(RepositoryType::Local);
    let _ = REPOSITORY.set(RepositoryFactory::create(repo_type));
    Ok(())
}

/// Get a reference to the global repository instance.
pub fn get_repository() -> Result<&'static Arc<dyn FullRepository>> {
    if REPOSITORY.get().is_none() {
        let _ = init_repository();
    }

    REPOSITORY
        .get()
        .context("Database not initialized. Call init_repository() first.")
}
