//! Bidirectional in-memory index of URL records.
//!
//! The index is a plain data structure with no locking of its own; the owning
//! repository guards it (together with the log) behind one lock so the three
//! maps are always updated as a unit.

use std::collections::HashMap;
use std::collections::HashSet;

use tracing::warn;

use crate::domain::entities::UrlRecord;
use crate::error::StoreError;

/// Forward, reverse and per-owner maps over the same set of records.
///
/// - `by_key` holds every record ever stored, tombstoned ones included, so a
///   deleted key resolves to [`StoreError::Gone`] rather than `NotFound`.
/// - `by_url` only holds active records; a tombstone frees the original URL.
/// - `by_owner` keeps each owner's keys in insertion order.
#[derive(Debug, Default)]
pub struct UrlIndex {
    by_key: HashMap<String, UrlRecord>,
    by_url: HashMap<String, String>,
    by_owner: HashMap<String, Vec<String>>,
}

impl UrlIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records, tombstoned ones included.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Number of records that are not tombstoned.
    pub fn active_len(&self) -> usize {
        self.by_url.len()
    }

    /// Checks that `record` can be inserted without breaking uniqueness.
    pub fn check_insert(&self, record: &UrlRecord) -> Result<(), StoreError> {
        if self.by_url.contains_key(&record.original_url) {
            return Err(StoreError::conflict(format!(
                "original URL is already shortened: {}",
                record.original_url
            )));
        }
        if self.by_key.contains_key(&record.short_key) {
            return Err(StoreError::conflict(format!(
                "short key is already taken: {}",
                record.short_key
            )));
        }
        Ok(())
    }

    /// Checks a whole batch, including duplicates inside the batch itself.
    pub fn check_batch(&self, records: &[UrlRecord]) -> Result<(), StoreError> {
        let mut keys = HashSet::with_capacity(records.len());
        let mut urls = HashSet::with_capacity(records.len());

        for record in records {
            self.check_insert(record)?;

            if !urls.insert(record.original_url.as_str()) {
                return Err(StoreError::conflict(format!(
                    "original URL appears twice in batch: {}",
                    record.original_url
                )));
            }
            if !keys.insert(record.short_key.as_str()) {
                return Err(StoreError::conflict(format!(
                    "short key appears twice in batch: {}",
                    record.short_key
                )));
            }
        }
        Ok(())
    }

    /// Inserts an active record after checking uniqueness.
    pub fn insert(&mut self, record: UrlRecord) -> Result<(), StoreError> {
        self.check_insert(&record)?;
        self.apply(record);
        Ok(())
    }

    /// Applies a record read back from the log.
    ///
    /// Replay never fails: a repeated short key overwrites the earlier entry
    /// (last write wins) and a tombstone line marks the key deleted. An active
    /// line for a URL that another active key already holds takes the URL over
    /// and the older key is tombstoned.
    pub fn replay(&mut self, record: UrlRecord) {
        if let Some(previous) = self.by_key.get(&record.short_key).cloned() {
            if self.by_url.get(&previous.original_url) == Some(&previous.short_key) {
                self.by_url.remove(&previous.original_url);
            }
            if previous.owner_id != record.owner_id
                && let Some(keys) = self.by_owner.get_mut(&previous.owner_id)
            {
                keys.retain(|k| k != &previous.short_key);
            }
        }

        if !record.deleted
            && let Some(holder) = self.by_url.get(&record.original_url).cloned()
            && holder != record.short_key
            && let Some(older) = self.by_key.get_mut(&holder)
        {
            warn!(
                original_url = %record.original_url,
                old_key = %holder,
                new_key = %record.short_key,
                "URL log holds two active keys for one URL, keeping the later"
            );
            older.deleted = true;
        }

        self.apply(record);
    }

    fn apply(&mut self, record: UrlRecord) {
        if !record.deleted {
            self.by_url
                .insert(record.original_url.clone(), record.short_key.clone());
        }

        let keys = self.by_owner.entry(record.owner_id.clone()).or_default();
        if !keys.contains(&record.short_key) {
            keys.push(record.short_key.clone());
        }

        self.by_key.insert(record.short_key.clone(), record);
    }

    /// Resolves a short key, distinguishing unknown keys from deleted ones.
    pub fn original_url(&self, short_key: &str) -> Result<String, StoreError> {
        match self.by_key.get(short_key) {
            None => Err(StoreError::not_found(format!("short key {short_key}"))),
            Some(record) if record.deleted => {
                Err(StoreError::gone(format!("short key {short_key} was deleted")))
            }
            Some(record) => Ok(record.original_url.clone()),
        }
    }

    /// Finds the key of the active record for an original URL.
    pub fn short_key(&self, original_url: &str) -> Result<String, StoreError> {
        self.by_url
            .get(original_url)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("original URL {original_url}")))
    }

    /// Active records of an owner in insertion order.
    pub fn owned_by(&self, owner_id: &str) -> Vec<UrlRecord> {
        self.by_owner
            .get(owner_id)
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| self.by_key.get(k))
                    .filter(|r| !r.deleted)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the record that `tombstone` would mark, without changing anything.
    ///
    /// Anonymous records (empty owner) have nobody entitled to delete them.
    pub fn deletable(&self, owner_id: &str, short_key: &str) -> Option<&UrlRecord> {
        if owner_id.is_empty() {
            return None;
        }
        self.by_key
            .get(short_key)
            .filter(|r| !r.deleted && r.owner_id == owner_id)
    }

    /// Marks a key deleted if it is active and belongs to `owner_id`.
    ///
    /// The forward entry is kept so lookups answer `Gone`; the reverse entry is
    /// dropped so the original URL can be shortened again. Returns the
    /// tombstoned record, or `None` if nothing changed.
    pub fn tombstone(&mut self, owner_id: &str, short_key: &str) -> Option<UrlRecord> {
        self.deletable(owner_id, short_key)?;

        let record = self.by_key.get_mut(short_key)?;
        record.deleted = true;
        let record = record.clone();

        if self.by_url.get(&record.original_url) == Some(&record.short_key) {
            self.by_url.remove(&record.original_url);
        }
        Some(record)
    }
}
