//! Content hashing for normalized documents.
//!
//! ```text
//! SHA-256(version.to_be_bytes() || 0x00 || canonical_text_bytes)
//! ```
//!
//! The normalizer version is part of the digest so two normalizer versions
//! never produce colliding identities for the same words. The corpus index uses
//! this hash to decide whether re-indexing a submission is a no-op.

use sha2::{Digest, Sha256};

/// Compute the content hash for rendered canonical text and version.
///
/// ```rust
/// use canonical::hash_canonical_bytes;
///
/// let v1 = hash_canonical_bytes(1, b"hello world.");
/// let v2 = hash_canonical_bytes(2, b"hello world.");
/// assert_ne!(v1, v2);
/// assert_eq!(v1, hash_canonical_bytes(1, b"hello world."));
/// assert_eq!(v1.len(), 64);
/// ```
pub fn hash_canonical_bytes(canonical_version: u32, canonical_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_version.to_be_bytes());
    hasher.update([0]);
    hasher.update(canonical_bytes);
    hex::encode(hasher.finalize())
}

/// Hash arbitrary text with SHA-256, without any version prefix.
///
/// Useful for diagnostics (e.g. logging a fingerprint of the raw submission
/// without logging its content).
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
