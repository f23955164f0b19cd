//! Short key generation.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of generated short keys.
pub const KEY_LENGTH: usize = 8;

/// Generates a random short key of [`KEY_LENGTH`] ASCII letters and digits.
///
/// Keys are not guaranteed unique; callers check the store and retry on
/// collision (see [`crate::application::services::UrlService`]).
pub fn generate_key() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect()
}
