//! Repository trait definitions for the domain layer.
//!
//! The [`UrlRepository`] trait is the storage contract every backend satisfies.
//! Implementations live in `crate::infrastructure::persistence`; a mock is
//! generated with `mockall` for service tests.
//!
//! # Testing
//!
//! See integration tests in `tests/repository_*.rs` for usage examples.

pub mod url_repository;

pub use url_repository::UrlRepository;

#[cfg(test)]
pub use url_repository::MockUrlRepository;
