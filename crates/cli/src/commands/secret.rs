//! Secret generation for `SHEKELS_SIGNING_KEY` and `SHEKELS_BUMP_KEY`.

use rand::{Rng, distr::Alphanumeric};

/// Shortest key the server accepts.
pub const MIN_LENGTH: usize = 32;

/// Generate a random alphanumeric secret of at least [`MIN_LENGTH`] chars.
#[must_use]
pub fn generate(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length.max(MIN_LENGTH))
        .map(char::from)
        .collect()
}
