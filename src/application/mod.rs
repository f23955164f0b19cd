//! Application layer services.
//!
//! Services sit between callers (the CLI, or an HTTP layer built on top of this
//! crate) and the [`crate::domain::repositories::UrlRepository`] backends.
//!
//! # Available Services
//!
//! - [`services::UrlService`] - Shortening, resolution and background deletion

pub mod services;
