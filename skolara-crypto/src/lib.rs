//! Cryptographic capability layer for Skolara licensing.
//!
//! This crate provides:
//! - Device-bound storage key derivation (SHA-256 over a fixed salt and the
//!   hardware fingerprint)
//! - AES-256-GCM sealing in the `base64(IV ‖ tag ‖ ciphertext)` at-rest
//!   format
//! - HMAC-SHA256 payload authentication
//! - A capability trait with a documented degraded fallback for runtimes
//!   without the strong primitives
//!
//! The licensing subsystem selects one capability at construction and
//! threads it through; degraded mode is visible, never silent.

mod cipher;
mod error;
mod key;
mod mac;
mod provider;

pub use cipher::{NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_storage_key, StorageKey, KEY_SIZE};
pub use mac::{fnv1a_hex, hmac_sha256_hex};
pub use provider::{CryptoCapability, FallbackCrypto, StrongCrypto};
