//! Crypto capability interface.
//!
//! The licensing subsystem runs in environments where the strong
//! primitives may be unavailable (stripped-down builds, auditing
//! sandboxes). That variability is modeled as two implementations of one
//! trait, selected once at construction; the degraded mode is announced,
//! never silent.

use crate::cipher;
use crate::error::CryptoResult;
use crate::key::StorageKey;
use crate::mac;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::warn;

/// Sealing and message authentication, strong or degraded.
pub trait CryptoCapability: Send + Sync {
    /// Seals plaintext under a key into the at-rest wire format.
    fn seal(&self, key: &StorageKey, plaintext: &[u8]) -> CryptoResult<String>;

    /// Opens a sealed blob. `None` on any failure.
    fn open(&self, key: &StorageKey, blob: &str) -> Option<Vec<u8>>;

    /// Authenticates a message under a key, returning a hex digest.
    fn mac(&self, key: &[u8], message: &[u8]) -> String;

    /// True for the weakened fallback implementation.
    fn is_degraded(&self) -> bool;
}

/// AES-256-GCM sealing and HMAC-SHA256 authentication.
#[derive(Debug, Default)]
pub struct StrongCrypto;

impl StrongCrypto {
    /// Creates the strong capability.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CryptoCapability for StrongCrypto {
    fn seal(&self, key: &StorageKey, plaintext: &[u8]) -> CryptoResult<String> {
        cipher::seal(key, plaintext)
    }

    fn open(&self, key: &StorageKey, blob: &str) -> Option<Vec<u8>> {
        cipher::open(key, blob)
    }

    fn mac(&self, key: &[u8], message: &[u8]) -> String {
        mac::hmac_sha256_hex(key, message)
    }

    fn is_degraded(&self) -> bool {
        false
    }
}

/// Degraded capability: plain base64 sealing, FNV-1a keyed digest.
///
/// Deters casual file edits only. Ciphertext is not bound to the device
/// and the digest is not cryptographic; every caller can see the mode via
/// [`CryptoCapability::is_degraded`].
#[derive(Debug)]
pub struct FallbackCrypto;

impl FallbackCrypto {
    /// Creates the degraded capability, logging the downgrade.
    #[must_use]
    pub fn new() -> Self {
        warn!("crypto capability degraded: plain base64 sealing, non-cryptographic digest");
        Self
    }
}

impl CryptoCapability for FallbackCrypto {
    fn seal(&self, _key: &StorageKey, plaintext: &[u8]) -> CryptoResult<String> {
        Ok(BASE64.encode(plaintext))
    }

    fn open(&self, _key: &StorageKey, blob: &str) -> Option<Vec<u8>> {
        BASE64.decode(blob.trim()).ok()
    }

    fn mac(&self, key: &[u8], message: &[u8]) -> String {
        mac::fnv1a_hex(key, message)
    }

    fn is_degraded(&self) -> bool {
        true
    }
}
