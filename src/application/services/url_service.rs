//! URL shortening, lookup and deletion service.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::entities::UrlRecord;
use crate::domain::repositories::UrlRepository;
use crate::domain::task_pool::TaskPool;
use crate::error::StoreError;
use crate::utils::key_generator::generate_key;
use crate::utils::url_normalizer::normalize_url;

/// Attempts before giving up on short key collisions.
const MAX_ATTEMPTS: usize = 10;

/// Result of shortening one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortened {
    pub short_key: String,
    /// `false` when the URL was already shortened and the existing key is returned.
    pub created: bool,
}

/// One entry of a batch shortening request.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// Short key assigned to a batch entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub correlation_id: String,
    pub short_key: String,
}

/// Service for creating, resolving and deleting short URLs.
///
/// Works against any [`UrlRepository`]. Deletion requested through
/// [`UrlService::delete_urls`] runs on the [`TaskPool`], so callers are not
/// blocked by storage writes.
pub struct UrlService<R: UrlRepository + ?Sized> {
    repository: Arc<R>,
    task_pool: Arc<TaskPool>,
}

impl<R: UrlRepository + ?Sized + 'static> UrlService<R> {
    /// Creates a new URL service.
    pub fn new(repository: Arc<R>, task_pool: Arc<TaskPool>) -> Self {
        Self {
            repository,
            task_pool,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Shortens a URL for an owner.
    ///
    /// # Deduplication
    ///
    /// If the normalized URL is already shortened, the store reports a conflict
    /// and the existing key is returned with `created: false`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] if the URL is not a valid HTTP(S) URL,
    /// and [`StoreError::Unavailable`] on storage failures or if no free key was
    /// found after repeated collisions.
    pub async fn shorten(&self, owner_id: &str, original_url: &str) -> Result<Shortened, StoreError> {
        let normalized = normalize_url(original_url)?;

        for attempt in 1..=MAX_ATTEMPTS {
            let short_key = generate_key();
            let record = UrlRecord::new(owner_id, short_key.clone(), normalized.clone());

            match self.repository.save(record).await {
                Ok(()) => {
                    debug!(%short_key, "URL shortened");
                    return Ok(Shortened {
                        short_key,
                        created: true,
                    });
                }
                Err(StoreError::Conflict(_)) => {
                    match self.repository.get_short_url(&normalized).await {
                        Ok(existing) => {
                            return Ok(Shortened {
                                short_key: existing,
                                created: false,
                            });
                        }
                        // The URL is free, so the generated key collided.
                        Err(StoreError::NotFound(_)) => {
                            warn!(attempt, "short key collision, retrying");
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::unavailable(
            "failed to generate a unique short key",
        ))
    }

    /// Shortens several URLs in one storage batch.
    ///
    /// URLs that are already shortened, or repeated within the batch, reuse
    /// their existing key. Only new mappings are written, all or nothing.
    pub async fn shorten_batch(
        &self,
        owner_id: &str,
        items: Vec<BatchItem>,
    ) -> Result<Vec<BatchResult>, StoreError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let normalized = items
            .iter()
            .map(|item| normalize_url(&item.original_url))
            .collect::<Result<Vec<_>, _>>()?;

        for attempt in 1..=MAX_ATTEMPTS {
            let mut keys: HashMap<&str, String> = HashMap::new();
            let mut new_records = Vec::new();

            for url in &normalized {
                if keys.contains_key(url.as_str()) {
                    continue;
                }
                let key = match self.repository.get_short_url(url).await {
                    Ok(existing) => existing,
                    Err(StoreError::NotFound(_)) => {
                        let key = generate_key();
                        new_records.push(UrlRecord::new(owner_id, key.clone(), url.clone()));
                        key
                    }
                    Err(e) => return Err(e),
                };
                keys.insert(url.as_str(), key);
            }

            match self.repository.save_batch(new_records).await {
                Ok(()) => {
                    return Ok(items
                        .iter()
                        .zip(&normalized)
                        .map(|(item, url)| BatchResult {
                            correlation_id: item.correlation_id.clone(),
                            short_key: keys[url.as_str()].clone(),
                        })
                        .collect());
                }
                Err(StoreError::Conflict(reason)) => {
                    warn!(attempt, %reason, "batch conflicted, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::unavailable("batch kept conflicting, giving up"))
    }

    /// Resolves a short key to its original URL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown keys and [`StoreError::Gone`]
    /// for deleted ones.
    pub async fn resolve(&self, short_key: &str) -> Result<String, StoreError> {
        self.repository.get_original_url(short_key).await
    }

    /// Finds the short key for an original URL (normalized first).
    pub async fn lookup(&self, original_url: &str) -> Result<String, StoreError> {
        let normalized = normalize_url(original_url)?;
        self.repository.get_short_url(&normalized).await
    }

    /// Lists the active URLs of an owner.
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<UrlRecord>, StoreError> {
        self.repository.get_by_owner(owner_id).await
    }

    /// Queues deletion of the owner's keys and returns immediately.
    ///
    /// The outcome is only reported to the task pool's error log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the task pool has been stopped.
    pub fn delete_urls(&self, owner_id: &str, short_keys: Vec<String>) -> Result<(), StoreError> {
        if short_keys.is_empty() {
            return Ok(());
        }

        let repository = self.repository.clone();
        let owner_id = owner_id.to_string();

        self.task_pool.add_task(async move {
            let deleted = repository.delete(&owner_id, short_keys).await?;
            debug!(%owner_id, deleted, "Deletion task finished");
            Ok(())
        })
    }

    /// Deletes the owner's keys in the caller's task.
    pub async fn delete_urls_now(
        &self,
        owner_id: &str,
        short_keys: Vec<String>,
    ) -> Result<u64, StoreError> {
        self.repository.delete(owner_id, short_keys).await
    }
}
