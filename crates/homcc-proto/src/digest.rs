//! Content digests used as cache keys.
//!
//! A [`Digest`] is the SHA-256 hash of a dependency file's exact byte
//! content. It is the cache key throughout the system: the client computes
//! it while scanning dependencies, the server compares it against what the
//! cache already holds, and the cache's on-disk fan-out layout is keyed by
//! it (see `homcc-server`).

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// SHA-256 digest of a file's exact byte content.
///
/// Serializes as a lowercase hex string so it round-trips through the
/// JSON-like message bodies unchanged.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Hash `bytes` and return the resulting digest.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex representation, e.g. `cache_dir/<first-2-hex>/<digest>`.
    #[must_use]
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// First two hex characters, used for the cache's fan-out directory.
    #[must_use]
    pub fn fan_out_prefix(self) -> String {
        hex::encode(&self.0[..1])
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Error parsing a [`Digest`] from a hex string.
#[derive(Debug, thiserror::Error)]
pub enum DigestParseError {
    /// The string was not valid hex.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    /// The decoded bytes were not 32 bytes long.
    #[error("expected 32 bytes, got {0}")]
    WrongLength(usize),
}

impl std::str::FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let array: [u8; 32] =
            bytes.try_into().map_err(|v: Vec<u8>| DigestParseError::WrongLength(v.len()))?;
        Ok(Self(array))
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(Digest::of(b"hello"), Digest::of(b"hello"));
        assert_ne!(Digest::of(b"hello"), Digest::of(b"world"));
    }

    #[test]
    fn hex_round_trip() {
        let d = Digest::of(b"translation unit");
        let hex = d.to_hex();
        let parsed: Digest = hex.parse().expect("should parse");
        assert_eq!(d, parsed);
    }

    #[test]
    fn json_round_trip() {
        let d = Digest::of(b"a header file");
        let json = serde_json::to_string(&d).expect("should serialize");
        assert_eq!(json, format!("\"{}\"", d.to_hex()));
        let parsed: Digest = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(d, parsed);
    }

    #[test]
    fn fan_out_prefix_is_two_hex_chars() {
        let d = Digest::of(b"x");
        assert_eq!(d.fan_out_prefix().len(), 2);
        assert!(d.to_hex().starts_with(&d.fan_out_prefix()));
    }
}
