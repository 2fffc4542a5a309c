//! Payload signing and verification.
//!
//! Signatures are HMAC-SHA256 over a fixed-order canonical subset of
//! payload fields, keyed with an application secret embedded in the
//! binary. This is a symmetric scheme: it protects against casual file
//! edits, not against a determined reverse-engineer who extracts the
//! secret. That tradeoff is inherent to fully-offline activation — an
//! asymmetric scheme would need a server-issued key distribution step
//! this system does not have.

use crate::payload::{LicenseKeyPayload, LicensePayload};
use skolara_crypto::CryptoCapability;
use std::sync::Arc;

/// Embedded application signing secret.
const SIGNING_SECRET: &[u8] = b"sk-lic-hmac-v1:7c1d9a4e2b8f4632a0d5e9c3b1f67a84";

/// Signs and verifies license and license-key payloads.
pub struct PayloadSigner {
    crypto: Arc<dyn CryptoCapability>,
}

impl PayloadSigner {
    /// Creates a signer over the given crypto capability.
    #[must_use]
    pub fn new(crypto: Arc<dyn CryptoCapability>) -> Self {
        Self { crypto }
    }

    /// Computes the signature for a license payload.
    #[must_use]
    pub fn sign_license(&self, payload: &LicensePayload) -> String {
        self.crypto
            .mac(SIGNING_SECRET, payload.canonical().as_bytes())
    }

    /// Verifies a license payload. Any mismatch means the payload is
    /// fully untrusted; there is no partial acceptance.
    #[must_use]
    pub fn verify_license(&self, payload: &LicensePayload) -> bool {
        !payload.signature.is_empty() && payload.signature == self.sign_license(payload)
    }

    /// Computes the signature for a license-key payload.
    #[must_use]
    pub fn sign_key(&self, key: &LicenseKeyPayload) -> String {
        self.crypto.mac(SIGNING_SECRET, key.canonical().as_bytes())
    }

    /// Verifies a license-key payload.
    #[must_use]
    pub fn verify_key(&self, key: &LicenseKeyPayload) -> bool {
        !key.signature.is_empty() && key.signature == self.sign_key(key)
    }

    /// True when signatures come from the degraded (non-HMAC) capability.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.crypto.is_degraded()
    }
}
