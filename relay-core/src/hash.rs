//! Opaque-hashing helper for fields that must never be logged or audited
//! in plaintext (tokens, client identifiers, actor identifiers).

use sha2::{Digest, Sha256};

/// Returns the hex-encoded SHA-256 digest of `value`, used wherever the
/// audit log or a status snapshot needs a stable but non-reversible
/// identifier for sensitive input.
pub fn opaque_hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
