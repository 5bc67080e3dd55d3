//! Centralized module for content digests of recovered payloads.
//!
//! The SHA-256 digest is the canonical identity of a recovered payload: it
//! keys reputation lookups and de-duplication.

use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of the given data and returns it as a hex string.
pub fn sha256_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
