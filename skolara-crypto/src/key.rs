//! Storage key derivation.
//!
//! License ciphertext is keyed off the device fingerprint so that copying
//! the encrypted bytes to another machine yields nothing decryptable,
//! independent of the signature check.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of storage keys in bytes (256 bits for AES-256-GCM).
pub const KEY_SIZE: usize = 32;

/// A derived storage key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StorageKey {
    bytes: [u8; KEY_SIZE],
}

impl StorageKey {
    /// Creates a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derives a storage key as `SHA-256(salt ‖ material)`.
///
/// `material` is the device fingerprint in the licensing subsystem; the
/// salt is a fixed application constant.
#[must_use]
pub fn derive_storage_key(salt: &[u8], material: &str) -> StorageKey {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(material.as_bytes());
    let hash = hasher.finalize();

    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&hash);
    StorageKey::from_bytes(bytes)
}
