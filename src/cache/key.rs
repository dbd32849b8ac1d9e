//! Content-derived cache keys.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::tape::NormalizedTape;

/// Length of a key in hex characters.
pub const KEY_LEN: usize = 64;

/// SHA-256 of a normalized tape's text, hex-encoded.
///
/// Safe as a single path segment. Two tapes with the same normalized lines
/// share a key no matter which files they came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key of a normalized tape.
    pub fn of(tape: &NormalizedTape) -> Self {
        Self::from_text(&tape.text())
    }

    /// Derive the key of already-joined tape text.
    pub fn from_text(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        Self(hex::encode(digest))
    }

    /// Accept a directory name as a key if it has the right shape.
    pub fn parse(name: &str) -> Option<Self> {
        let valid = name.len() == KEY_LEN
            && name
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(name.to_owned()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the cache key of a normalized tape.
#[inline]
pub fn key_of(tape: &NormalizedTape) -> CacheKey {
    CacheKey::of(tape)
}
