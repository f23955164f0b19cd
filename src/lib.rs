//! # linkstore
//!
//! Storage layer for a URL shortener: maps short keys to original URLs, keyed
//! additionally by owner, with soft deletion.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]) - Record type, the [`domain::repositories::UrlRepository`]
//!   trait and the background [`domain::task_pool::TaskPool`]
//! - **Application Layer** ([`application`]) - [`application::services::UrlService`]
//! - **Infrastructure Layer** ([`infrastructure`]) - In-memory/file and PostgreSQL backends
//!
//! ## Backends
//!
//! - PostgreSQL, selected by `DATABASE_DSN`; the `urls` table is created on first use
//! - In-memory index with an append-only JSON-lines log at `FILE_STORAGE_PATH`
//! - Pure in-memory when neither is configured
//!
//! ## Configuration
//!
//! Loaded from environment variables via [`config::Config`].

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod logging;
pub mod utils;

pub use error::StoreError;

/// Commonly used types for external consumers.
pub mod prelude {
    pub use crate::application::services::{BatchItem, BatchResult, Shortened, UrlService};
    pub use crate::domain::entities::UrlRecord;
    pub use crate::domain::repositories::UrlRepository;
    pub use crate::domain::task_pool::TaskPool;
    pub use crate::error::StoreError;
    pub use crate::infrastructure::persistence::{
        MemoryUrlRepository, PgUrlRepository, open_repository,
    };
}
