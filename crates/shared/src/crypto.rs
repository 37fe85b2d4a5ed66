//! Cryptographic utilities for admin credential checks.

use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of the input.
pub fn sha256(input: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher.finalize().into()
}

/// Compares two secrets without short-circuiting on the first differing byte.
///
/// Both sides are hashed first so the comparison length never depends on the
/// length of the supplied value.
pub fn secrets_match(supplied: &str, expected: &str) -> bool {
    let a = sha256(supplied);
    let b = sha256(expected);
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
