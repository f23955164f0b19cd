//! URL validation and normalization.
//!
//! Shortened and looked-up URLs go through the same normalization so that
//! `HTTPS://Example.com:443/a#top` and `https://example.com/a` map to one key.

use url::Url;

use crate::error::StoreError;

/// Errors that can occur during URL normalization.
#[derive(Debug, thiserror::Error)]
pub enum UrlNormalizationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("Failed to normalize URL: {0}")]
    NormalizationFailed(String),
}

impl From<UrlNormalizationError> for StoreError {
    fn from(e: UrlNormalizationError) -> Self {
        StoreError::invalid(e.to_string())
    }
}

/// Normalizes a URL to a canonical form.
///
/// # Normalization Rules
///
/// 1. Surrounding whitespace is trimmed
/// 2. Only HTTP and HTTPS are allowed
/// 3. Hostname is lowercased
/// 4. Default ports (80, 443) are removed
/// 5. Fragments are removed
/// 6. Path and query are preserved as-is
pub fn normalize_url(input: &str) -> Result<String, UrlNormalizationError> {
    let mut url = Url::parse(input.trim())
        .map_err(|e| UrlNormalizationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlNormalizationError::UnsupportedProtocol),
    }

    if let Some(host) = url.host_str() {
        let host_lowercase = host.to_ascii_lowercase();
        url.set_host(Some(&host_lowercase)).map_err(|_| {
            UrlNormalizationError::NormalizationFailed("cannot set host".to_string())
        })?;
    }

    url.set_fragment(None);

    if matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    ) {
        url.set_port(None).map_err(|_| {
            UrlNormalizationError::NormalizationFailed("cannot remove default port".to_string())
        })?;
    }

    Ok(url.to_string())
}
