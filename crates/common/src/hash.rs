//! Content hashing for stable identifiers.
//!
//! Domain ids, message type ids and keyed aggregate ids are all derived from
//! the SHA-256 digest of their canonical text, truncated to the needed width.

use sha2::{Digest, Sha256};

fn digest(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut out = [0_u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Returns the first 8 digest bytes, big-endian, as an `i64`.
pub fn content_hash(data: &[u8]) -> i64 {
    let digest = digest(data);
    let mut buf = [0_u8; 8];
    buf.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(buf)
}

/// Returns the first 4 digest bytes, big-endian, as an `i32`.
pub fn content_hash32(data: &[u8]) -> i32 {
    let digest = digest(data);
    let mut buf = [0_u8; 4];
    buf.copy_from_slice(&digest[..4]);
    i32::from_be_bytes(buf)
}
