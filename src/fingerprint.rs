//! Content fingerprints for canonical record names

use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hex digits of the digest kept in generated record names
const NAME_DIGITS: usize = 16;

/// SHA256 fingerprint of canonical schema content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute fingerprint from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute fingerprint from a JSON value.
    ///
    /// `serde_json` keeps object keys sorted (no `preserve_order`), so equal
    /// values always render to the same bytes.
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self::from_bytes(value.to_string().as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Record name derived from this fingerprint, e.g. `Record_1f0c9a...`
    pub fn record_name(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, &self.0[..NAME_DIGITS])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
