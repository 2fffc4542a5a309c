//! Offline license enforcement and device binding for Skolara.
//!
//! This crate decides, entirely without a network, whether an
//! installation is authorized to run, while resisting casual tampering:
//! clock rollback, storage cloning, license-file copying across machines,
//! and trial reuse.
//!
//! # Design Principles
//!
//! - **Offline-first**: no license server; admin-issued keys and
//!   pre-issued payloads are redeemed locally.
//! - **Device binding**: licenses are tied to a hardware fingerprint, and
//!   the ciphertext itself is keyed off it.
//! - **Redundant tamper evidence**: fingerprints and flags live in two
//!   independent stores; clearing one does not reset them.
//! - **Degradation over failure**: storage and crypto problems weaken the
//!   subsystem visibly, they never crash it.
//!
//! # Lifecycles
//!
//! Two distinct credentials: the admin-issued, human-enterable
//! [`LicenseKeyPayload`] (single-use, revocable) and the device-bound
//! [`LicensePayload`] it redeems into. The [`LicenseValidator`] judges
//! the latter on every app start.

mod activation;
mod clock;
mod codec;
mod device;
mod error;
mod facade;
mod install;
mod key;
mod payload;
mod signer;
mod store;
mod trial;
mod validator;

pub use activation::{KeyActivationContext, OfflineActivationService};
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::LicenseCodec;
pub use device::{DeviceFingerprint, BYPASS_HWID};
pub use error::{LicenseError, LicenseResult};
pub use facade::{Licensing, LicensingConfig};
pub use install::InstallFingerprint;
pub use key::{
    generate_key_text, KeyRecord, KeyRequest, LicenseKeyFactory, LicenseKeyStore,
    DEFAULT_KEY_DURATION_DAYS, KEY_ALPHABET,
};
pub use payload::{
    ceil_days, format_ts, parse_ts, InstallIntegrity, KeyKind, KeyStatus, LicenseKeyPayload,
    LicensePayload, LicenseType, ValidationOutcome, ValidationReason, ValidationStatus,
};
pub use signer::PayloadSigner;
pub use store::LicenseStore;
pub use trial::{TrialManager, TRIAL_DURATION_DAYS};
pub use validator::{
    EnforcementDecision, EnforcementOptions, LicenseValidator, GRACE_PERIOD_DAYS,
};
