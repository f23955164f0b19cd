//! Utility functions for short key generation and URL processing.
//!
//! - [`key_generator`] - Random short key generation
//! - [`url_normalizer`] - URL validation and normalization

pub mod key_generator;
pub mod url_normalizer;
