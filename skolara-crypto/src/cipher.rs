//! At-rest sealing using AES-256-GCM.
//!
//! Wire format: `base64(IV(12B) ‖ tag(16B) ‖ ciphertext)`. The AEAD
//! primitive appends the tag to the ciphertext; the at-rest format carries
//! it between the IV and the ciphertext body, so sealing and opening
//! re-frame explicitly.

use crate::error::{CryptoError, CryptoResult};
use crate::key::StorageKey;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;

/// Size of the IV in bytes (96 bits for AES-GCM).
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Seals plaintext under a storage key, producing the base64 wire format.
///
/// # Errors
///
/// Returns an error if the AEAD encryption itself fails.
pub fn seal(key: &StorageKey, plaintext: &[u8]) -> CryptoResult<String> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    // encrypt() yields ciphertext ‖ tag
    let sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let (body, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

    let mut framed = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + body.len());
    framed.extend_from_slice(&nonce_bytes);
    framed.extend_from_slice(tag);
    framed.extend_from_slice(body);
    Ok(BASE64.encode(&framed))
}

/// Opens a sealed blob. `None` on any failure: bad base64, short frame,
/// wrong key, or a tampered tag.
#[must_use]
pub fn open(key: &StorageKey, blob: &str) -> Option<Vec<u8>> {
    let framed = BASE64.decode(blob.trim()).ok()?;
    if framed.len() < NONCE_SIZE + TAG_SIZE {
        return None;
    }

    let nonce = Nonce::from_slice(&framed[..NONCE_SIZE]);
    let tag = &framed[NONCE_SIZE..NONCE_SIZE + TAG_SIZE];
    let body = &framed[NONCE_SIZE + TAG_SIZE..];

    // Rebuild ciphertext ‖ tag for the AEAD primitive.
    let mut sealed = Vec::with_capacity(body.len() + TAG_SIZE);
    sealed.extend_from_slice(body);
    sealed.extend_from_slice(tag);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher.decrypt(nonce, sealed.as_ref()).ok()
}
