//! Repository trait for short key / original URL mappings.

use crate::domain::entities::UrlRecord;
use crate::error::StoreError;
use async_trait::async_trait;

/// Storage contract satisfied by every backend.
///
/// Callers hold an `Arc<dyn UrlRepository>` chosen once at startup by
/// [`crate::infrastructure::persistence::open_repository`]; no code path
/// inspects the concrete type afterwards.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::MemoryUrlRepository`] - in-memory index with optional append-only log
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Stores one record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if an active record already has the same
    /// original URL or the short key is taken. The existing key is not looked up
    /// automatically; callers use [`UrlRepository::get_short_url`] for that.
    ///
    /// Returns [`StoreError::Invalid`] for a malformed record and
    /// [`StoreError::Unavailable`] on I/O or connection failures.
    async fn save(&self, record: UrlRecord) -> Result<(), StoreError>;

    /// Stores a batch of records, all or nothing.
    ///
    /// # Errors
    ///
    /// Same as [`UrlRepository::save`]; on error none of the batch is visible.
    async fn save_batch(&self, records: Vec<UrlRecord>) -> Result<(), StoreError>;

    /// Resolves a short key to its original URL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the key was never stored and
    /// [`StoreError::Gone`] if its record has been deleted.
    async fn get_original_url(&self, short_key: &str) -> Result<String, StoreError>;

    /// Finds the short key of the active record for an original URL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no active record has this URL.
    async fn get_short_url(&self, original_url: &str) -> Result<String, StoreError>;

    /// Lists the active records created by an owner.
    ///
    /// An owner without records yields an empty list, not an error.
    async fn get_by_owner(&self, owner_id: &str) -> Result<Vec<UrlRecord>, StoreError>;

    /// Tombstones the listed keys that belong to `owner_id`.
    ///
    /// Keys owned by someone else, unknown keys and already deleted keys are
    /// skipped. An empty `owner_id` deletes nothing, so anonymous records
    /// cannot be removed. Returns the number of records that were tombstoned.
    async fn delete(&self, owner_id: &str, short_keys: Vec<String>) -> Result<u64, StoreError>;

    /// Releases the log file or connection pool. Safe to call more than once.
    async fn close(&self);

    /// Returns true if the backend can currently serve requests.
    async fn health_check(&self) -> bool;

    /// Short backend name for logs (`memory`, `file`, `postgres`).
    fn backend_name(&self) -> &'static str;
}
