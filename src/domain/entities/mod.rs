//! Core domain entities.
//!
//! - [`UrlRecord`] - A short key to original URL mapping with its owner and tombstone flag

pub mod record;

pub use record::UrlRecord;
