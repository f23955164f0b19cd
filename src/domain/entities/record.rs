//! URL record entity: one short key to original URL mapping.

use crate::error::StoreError;

/// A stored mapping between a short key and its original URL.
///
/// Records are created once and never mutated except for the one-way
/// `deleted` transition performed by an owner-scoped delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub owner_id: String,
    pub short_key: String,
    pub original_url: String,
    pub deleted: bool,
}

impl UrlRecord {
    /// Creates a new active record.
    pub fn new(
        owner_id: impl Into<String>,
        short_key: impl Into<String>,
        original_url: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            short_key: short_key.into(),
            original_url: original_url.into(),
            deleted: false,
        }
    }

    /// Returns true if the record has been tombstoned.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Checks the fields every backend relies on.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] if the short key or original URL is empty.
    /// An empty owner is allowed and means "anonymous".
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.short_key.trim().is_empty() {
            return Err(StoreError::invalid("short key must not be empty"));
        }
        if self.original_url.trim().is_empty() {
            return Err(StoreError::invalid("original URL must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let record = UrlRecord::new("u1", "abc123", "https://example.com");

        assert_eq!(record.owner_id, "u1");
        assert_eq!(record.short_key, "abc123");
        assert_eq!(record.original_url, "https://example.com");
        assert!(!record.is_deleted());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_anonymous_owner_is_valid() {
        let record = UrlRecord::new("", "abc123", "https://example.com");
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_empty_short_key_is_invalid() {
        let record = UrlRecord::new("u1", "  ", "https://example.com");
        let err = record.validate().unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(err.to_string().contains("short key"));
    }

    #[test]
    fn test_empty_original_url_is_invalid() {
        let record = UrlRecord::new("u1", "abc123", "");
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains("original URL"));
    }
}
