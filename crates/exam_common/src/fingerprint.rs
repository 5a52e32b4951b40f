//! Task fingerprints
//!
//! A fingerprint is the lowercase hex SHA-256 of the task text. It is the
//! primary key of the task cache, so it must never depend on anything but
//! the text bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a fingerprint in hex characters
pub const FINGERPRINT_LEN: usize = 64;

/// Fixed-length identifier derived from task text
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse an externally supplied fingerprint (e.g. from a URL path).
    ///
    /// Accepts exactly 64 hex digits; uppercase input is normalized.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() != FINGERPRINT_LEN || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compute the fingerprint of a task text
pub fn fingerprint(text: &str) -> Fingerprint {
    let digest = Sha256::digest(text.as_bytes());
    Fingerprint(hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint("Решите уравнение: 2x^2 + 3x - 5 = 0");
        let b = fingerprint("Решите уравнение: 2x^2 + 3x - 5 = 0");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_known_vectors() {
        // Stable across restarts: pinned SHA-256 values
        assert_eq!(
            fingerprint("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            fingerprint("abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_differs_on_whitespace() {
        assert_ne!(fingerprint("x = 1"), fingerprint("x=1"));
    }

    #[test]
    fn test_parse_roundtrip_and_rejects() {
        let fp = fingerprint("abc");
        assert_eq!(Fingerprint::parse(fp.as_str()), Some(fp.clone()));
        assert_eq!(
            Fingerprint::parse(&fp.as_str().to_uppercase()),
            Some(fp)
        );
        assert!(Fingerprint::parse("abc").is_none());
        assert!(Fingerprint::parse(&"z".repeat(FINGERPRINT_LEN)).is_none());
    }

    #[test]
    fn test_short_prefix() {
        let fp = fingerprint("abc");
        assert_eq!(fp.short(), "ba7816bf8f01");
    }
}
