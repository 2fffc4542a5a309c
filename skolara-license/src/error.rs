//! Error types for the licensing subsystem.
//!
//! Policy outcomes the validator reports (expired, mismatched, tampered)
//! are *values* in [`crate::ValidationOutcome`], not errors. The variants
//! here cover the imperative operations: issuing trials, redeeming keys,
//! activating payloads, persisting state.

use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// A license is already installed and `allow_update` was not set.
    #[error("a license already exists for this installation")]
    LicenseAlreadyExists,

    /// The trial was already consumed on this device.
    #[error("trial already used on this device")]
    TrialAlreadyUsed,

    /// Activation text could not be decoded as JSON or base64 JSON.
    #[error("activation payload could not be decoded: {0}")]
    UnreadablePayload(String),

    /// HMAC signature verification failed.
    #[error("payload signature invalid")]
    BadSignature,

    /// The payload is bound to a different device.
    #[error("license is bound to a different device")]
    HwidMismatch,

    /// The payload names a different school than this installation.
    #[error("school mismatch: expected {expected}, found {found}")]
    SchoolMismatch {
        /// UID of the installing school.
        expected: String,
        /// UID carried by the payload.
        found: String,
    },

    /// A date field could not be parsed as RFC 3339.
    #[error("malformed date field: {0}")]
    MalformedDate(String),

    /// The license end date is already in the past.
    #[error("license expired on {0}")]
    Expired(String),

    /// The license key was revoked by the issuer.
    #[error("license key has been revoked")]
    KeyRevoked,

    /// The license key was already redeemed on this device. Keys are
    /// strictly single-use, re-redemption is a bug to surface.
    #[error("license key already activated on this device")]
    KeyAlreadyActivated,

    /// The license key was already redeemed on another device.
    #[error("license key already activated on another device")]
    KeyBoundElsewhere,

    /// The license key itself has expired.
    #[error("license key expired on {0}")]
    KeyExpired(String),

    /// Redemption attempted on an internal/admin device without the
    /// explicit bypass.
    #[error("activation on an internal device requires an explicit bypass")]
    InternalDeviceBlocked,

    /// No storage location accepted the write.
    #[error("persistence unavailable: {0}")]
    Storage(String),

    /// Crypto layer error.
    #[error("crypto error: {0}")]
    Crypto(#[from] skolara_crypto::CryptoError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
