// pattern-core/src/core/hashing.rs
// ============================================================================
// Module: Pattern Core Hashing
// Description: Canonical-JSON hashing for signature and content fingerprints.
// Purpose: Produce stable, cross-version identity fingerprints.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! Signature hashes and content fingerprints are computed by canonicalizing
//! a value per RFC 8785 (JSON Canonicalization Scheme) and hashing the
//! resulting bytes. Canonicalization removes key-order and whitespace
//! variance so two equivalent signatures always hash identically.

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

/// Hash algorithm used to compute a digest. A single variant today, kept as
/// an enum so a future algorithm can be added without breaking callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 over canonical JSON bytes.
    Sha256,
}

/// The hash algorithm used when none is explicitly requested.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// A digest produced by [`hash_canonical_json`] or [`hash_bytes`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct HashDigest {
    /// Algorithm that produced [`Self::value`].
    pub algorithm: HashAlgorithm,
    /// Lower-case hex encoding of the digest bytes.
    pub value: String,
}

/// Errors that can occur while hashing a value.
#[derive(Debug, Error)]
pub enum HashError {
    /// The value could not be canonicalized to JSON.
    #[error("failed to canonicalize value to JSON: {0}")]
    Canonicalization(String),
}

/// Serializes `value` to RFC 8785 canonical JSON bytes.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes `value` after canonicalizing it to JSON.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes with the given algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest {
                algorithm,
                value: hex_encode(&digest),
            }
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test assertions may unwrap, expect, or panic on failure"
    )]
    use super::*;

    #[test]
    fn hashing_is_deterministic_and_key_order_independent() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        let digest_a = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &a).expect("hash");
        let digest_b = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &b).expect("hash");
        assert_eq!(digest_a, digest_b);
    }

    #[test]
    fn hash_bytes_is_stable() {
        let digest = hash_bytes(HashAlgorithm::Sha256, b"hello");
        assert_eq!(
            digest.value,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
