//! Storage backends implementing [`UrlRepository`].
//!
//! # Repositories
//!
//! - [`MemoryUrlRepository`] - In-memory [`index::UrlIndex`] with optional [`durable_log::DurableLog`]
//! - [`PgUrlRepository`] - PostgreSQL storage with lazy schema creation
//!
//! [`open_repository`] is the single place where a backend is chosen.

pub mod codec;
pub mod durable_log;
pub mod index;
pub mod memory_url_repository;
pub mod pg_url_repository;

pub use memory_url_repository::MemoryUrlRepository;
pub use pg_url_repository::PgUrlRepository;

use std::sync::Arc;

use crate::config::StorageBackend;
use crate::domain::repositories::UrlRepository;
use crate::error::StoreError;

/// Opens the backend selected by configuration.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the database is unreachable or the
/// log file cannot be opened or replayed.
pub async fn open_repository(
    backend: &StorageBackend,
) -> Result<Arc<dyn UrlRepository>, StoreError> {
    let repository: Arc<dyn UrlRepository> = match backend {
        StorageBackend::Postgres { dsn, pool } => {
            Arc::new(PgUrlRepository::connect(dsn, pool).await?)
        }
        StorageBackend::File { path } => Arc::new(MemoryUrlRepository::open(path).await?),
        StorageBackend::Memory => Arc::new(MemoryUrlRepository::new()),
    };

    tracing::info!(backend = repository.backend_name(), "Storage opened");
    Ok(repository)
}
