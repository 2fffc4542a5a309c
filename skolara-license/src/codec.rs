//! License at-rest encryption.
//!
//! Ciphertext is keyed off the *current device's* HWID, which binds the
//! stored bytes to the machine independently of the signature check:
//! copying the license file to another machine leaves nothing
//! decryptable there.

use crate::error::LicenseResult;
use crate::payload::LicensePayload;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use skolara_crypto::{derive_storage_key, CryptoCapability};
use std::sync::Arc;

/// Fixed salt mixed into the storage key derivation.
const STORAGE_SALT: &[u8] = b"sk-license-at-rest-v1";

/// Encrypts and decrypts license payloads for storage.
pub struct LicenseCodec {
    crypto: Arc<dyn CryptoCapability>,
}

impl LicenseCodec {
    /// Creates a codec over the given crypto capability.
    #[must_use]
    pub fn new(crypto: Arc<dyn CryptoCapability>) -> Self {
        Self { crypto }
    }

    /// Encrypts a payload under the given HWID.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or sealing fails.
    pub fn encrypt(&self, payload: &LicensePayload, hwid: &str) -> LicenseResult<String> {
        let json = serde_json::to_vec(payload)?;
        let key = derive_storage_key(STORAGE_SALT, hwid);
        Ok(self.crypto.seal(&key, &json)?)
    }

    /// Decrypts a stored blob under the given HWID. `None` on any
    /// failure — bad base64, failed authentication, unparseable JSON —
    /// never an error.
    ///
    /// The AEAD path is attempted first; plain base64 JSON is accepted as
    /// the degraded-mode fallback so blobs written without the strong
    /// capability remain readable.
    #[must_use]
    pub fn decrypt(&self, blob: &str, hwid: &str) -> Option<LicensePayload> {
        let key = derive_storage_key(STORAGE_SALT, hwid);
        if let Some(bytes) = self.crypto.open(&key, blob) {
            if let Ok(payload) = serde_json::from_slice(&bytes) {
                return Some(payload);
            }
        }

        let bytes = BASE64.decode(blob.trim()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}
