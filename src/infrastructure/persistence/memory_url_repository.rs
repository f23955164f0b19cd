//! In-memory URL repository with optional append-only file durability.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::durable_log::DurableLog;
use super::index::UrlIndex;
use crate::domain::entities::UrlRecord;
use crate::domain::repositories::UrlRepository;
use crate::error::StoreError;

#[derive(Debug)]
struct State {
    index: UrlIndex,
    log: Option<DurableLog>,
    closed: bool,
}

/// Repository keeping every record in a [`UrlIndex`].
///
/// When opened with a path, each write is also appended to a [`DurableLog`],
/// and the log is replayed on startup to rebuild the index. One lock covers
/// the index and the log so a write updates both as a unit; reads share the
/// lock.
///
/// Writes reach the log before the index, so a failed append is reported as
/// [`StoreError::Unavailable`] and leaves memory unchanged.
#[derive(Debug)]
pub struct MemoryUrlRepository {
    state: RwLock<State>,
    durable: bool,
}

impl MemoryUrlRepository {
    /// Creates a repository with no durability.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                index: UrlIndex::new(),
                log: None,
                closed: false,
            }),
            durable: false,
        }
    }

    /// Opens the log at `path`, replays it and keeps it open for appends.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the log cannot be opened or holds
    /// an undecodable line.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let (log, records) = DurableLog::open(path).await?;

        let mut index = UrlIndex::new();
        let replayed = records.len();
        for record in records {
            index.replay(record);
        }

        info!(
            replayed,
            records = index.len(),
            active = index.active_len(),
            "URL index rebuilt from log"
        );

        Ok(Self {
            state: RwLock::new(State {
                index,
                log: Some(log),
                closed: false,
            }),
            durable: true,
        })
    }

    /// Number of records held, tombstoned ones included.
    pub async fn len(&self) -> usize {
        self.state.read().await.index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.index.is_empty()
    }
}

impl Default for MemoryUrlRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_open(state: &State) -> Result<(), StoreError> {
    if state.closed {
        return Err(StoreError::unavailable("store is closed"));
    }
    Ok(())
}

#[async_trait]
impl UrlRepository for MemoryUrlRepository {
    async fn save(&self, record: UrlRecord) -> Result<(), StoreError> {
        record.validate()?;

        let mut state = self.state.write().await;
        ensure_open(&state)?;

        // The log is written first so a failed append leaves the index untouched.
        state.index.check_insert(&record)?;
        if let Some(log) = state.log.as_mut() {
            log.append(&record).await?;
        }
        state.index.insert(record.clone())?;

        debug!(short_key = %record.short_key, "Record saved");
        Ok(())
    }

    async fn save_batch(&self, records: Vec<UrlRecord>) -> Result<(), StoreError> {
        for record in &records {
            record.validate()?;
        }

        let mut state = self.state.write().await;
        ensure_open(&state)?;

        // Nothing is applied unless the whole batch fits.
        state.index.check_batch(&records)?;
        if let Some(log) = state.log.as_mut() {
            log.append_all(&records).await?;
        }
        let count = records.len();
        for record in records {
            state.index.insert(record)?;
        }

        debug!(count, "Batch saved");
        Ok(())
    }

    async fn get_original_url(&self, short_key: &str) -> Result<String, StoreError> {
        self.state.read().await.index.original_url(short_key)
    }

    async fn get_short_url(&self, original_url: &str) -> Result<String, StoreError> {
        self.state.read().await.index.short_key(original_url)
    }

    async fn get_by_owner(&self, owner_id: &str) -> Result<Vec<UrlRecord>, StoreError> {
        Ok(self.state.read().await.index.owned_by(owner_id))
    }

    async fn delete(&self, owner_id: &str, short_keys: Vec<String>) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        ensure_open(&state)?;

        let mut seen = HashSet::new();
        let tombstones: Vec<UrlRecord> = short_keys
            .iter()
            .filter(|key| seen.insert(key.as_str()))
            .filter_map(|key| state.index.deletable(owner_id, key).cloned())
            .map(|record| UrlRecord {
                deleted: true,
                ..record
            })
            .collect();

        if let Some(log) = state.log.as_mut() {
            log.append_all(&tombstones).await?;
        }
        for record in &tombstones {
            state.index.tombstone(owner_id, &record.short_key);
        }

        debug!(
            owner_id,
            requested = short_keys.len(),
            deleted = tombstones.len(),
            "Records deleted"
        );
        Ok(tombstones.len() as u64)
    }

    async fn close(&self) {
        let mut state = self.state.write().await;
        if state.closed {
            return;
        }
        state.closed = true;

        if let Some(mut log) = state.log.take() {
            if let Err(e) = log.sync().await {
                warn!(error = %e, path = %log.path().display(), "Failed to sync URL log on close");
            }
            info!(path = %log.path().display(), "URL log closed");
        }
    }

    async fn health_check(&self) -> bool {
        !self.state.read().await.closed
    }

    fn backend_name(&self) -> &'static str {
        if self.durable { "file" } else { "memory" }
    }
}
