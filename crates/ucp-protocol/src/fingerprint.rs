//! Content-addressed cache keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use ucp_core::hash::sha256_hex;
use ucp_core::text::truncate_str;

/// SHA-256 fingerprint of normalized input, as lowercase hex.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap a stored key.
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for logs.
    pub fn short(&self) -> &str {
        truncate_str(&self.0, 12)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Case-fold and trim input for fingerprinting.
pub fn normalize_for_key(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Fingerprint raw input.
pub fn fingerprint(input: &str) -> CacheKey {
    CacheKey(sha256_hex(normalize_for_key(input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insensitive_to_case_and_outer_whitespace() {
        assert_eq!(fingerprint("  Hello World \n"), fingerprint("hello world"));
    }

    #[test]
    fn inner_whitespace_matters() {
        assert_ne!(fingerprint("hello  world"), fingerprint("hello world"));
    }

    #[test]
    fn key_is_sha256_hex() {
        let key = fingerprint("x");
        assert!(ucp_core::hash::is_sha256_hex(key.as_str()));
        assert_eq!(key.short().len(), 12);
    }
}
