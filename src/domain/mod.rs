//! Domain layer containing the storage contract and background work.
//!
//! # Architecture
//!
//! - [`entities`] - Core data structures ([`entities::UrlRecord`])
//! - [`repositories`] - The [`repositories::UrlRepository`] storage contract
//! - [`task_pool`] - Fixed-size worker pool for asynchronous storage tasks
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by the infrastructure layer
//! - Business logic is encapsulated in services (see [`crate::application::services`])
//!
//! # Deletion Flow
//!
//! 1. Caller asks [`crate::application::services::UrlService`] to delete keys
//! 2. The service queues a task on [`task_pool::TaskPool`] and returns immediately
//! 3. A worker runs [`repositories::UrlRepository::delete`]
//! 4. Failures are logged by the pool's error sink

pub mod entities;
pub mod repositories;
pub mod task_pool;
