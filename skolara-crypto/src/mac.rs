//! Message authentication for license payloads.
//!
//! Primary scheme is HMAC-SHA256 over the canonical payload string, keyed
//! with the embedded application secret, hex-encoded. A non-cryptographic
//! FNV-1a fallback exists for the degraded capability; it deters casual
//! edits only.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the hex-encoded HMAC-SHA256 of `message` under `key`.
#[must_use]
pub fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail; if it ever
    // did, degrade to the keyed fallback digest rather than panic.
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return fnv1a_hex(key, message);
    };
    mac.update(message);
    to_hex(&mac.finalize().into_bytes())
}

/// Keyed FNV-1a digest, hex-encoded. Degraded-mode stand-in for HMAC.
#[must_use]
pub fn fnv1a_hex(key: &[u8], message: &[u8]) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET;
    for byte in key.iter().chain(message) {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    format!("{hash:016x}")
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write as _;
        let _ = write!(out, "{b:02x}");
    }
    out
}
