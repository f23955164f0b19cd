//! Error taxonomy shared by every storage backend.

use std::io;

/// Errors returned by [`crate::domain::repositories::UrlRepository`] implementations
/// and the services built on top of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// An active record already owns the original URL (or the short key is taken).
    #[error("conflict: {0}")]
    Conflict(String),

    /// No record exists for the requested key, URL or owner.
    #[error("not found: {0}")]
    NotFound(String),

    /// The short key exists but its record has been deleted.
    #[error("gone: {0}")]
    Gone(String),

    /// I/O, connection or transaction failure.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The record was rejected before reaching persistence.
    #[error("invalid record: {0}")]
    Invalid(String),
}

impl StoreError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
    pub fn gone(message: impl Into<String>) -> Self {
        Self::Gone(message.into())
    }
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// HTTP status a request handler should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Invalid(_) => 400,
            StoreError::NotFound(_) => 404,
            StoreError::Conflict(_) => 409,
            StoreError::Gone(_) => 410,
            StoreError::Unavailable(_) => 503,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::unavailable(format!("I/O error: {e}"))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        map_sqlx_error(e)
    }
}

/// SQLSTATE reported by PostgreSQL when a referenced table does not exist.
const UNDEFINED_TABLE: &str = "42P01";

/// Returns true if the database reported that the `urls` table is missing.
pub fn is_undefined_table(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNDEFINED_TABLE)
}

pub fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("urls_pkey") => StoreError::conflict("short key is already taken"),
                _ => StoreError::conflict("original URL is already shortened"),
            };
        }
    }

    StoreError::unavailable(format!("database error: {e}"))
}
