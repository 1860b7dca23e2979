//! SHA-256 derived identifiers for the in-memory chain and dry-run placeholders.

use sha2::{Digest, Sha256};

use crate::value::Address;

/// SHA-256 over the concatenation of `parts`.
pub fn compute(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Address taken from the last 20 bytes of the digest.
pub fn derive_address(parts: &[&[u8]]) -> Address {
    let digest = compute(parts);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address(out)
}
