//! The license validation state machine.
//!
//! `validate` applies its checks in a fixed priority order; the first
//! match wins, so a license that fails several ways reports the hardest
//! failure. The order:
//!
//! 1. host bypass, 2. nothing stored, 3. undecryptable bytes, 4. bad
//! signature, 5. unbound template, 6. foreign device, 7. wrong school,
//! 8. clock rollback, 9. expiry and grace window, 10. valid/trial with a
//! ratchet refresh.
//!
//! The ratchet: on every successful validation the verification
//! timestamps advance to now and are persisted (re-signed, since
//! `last_verified_at` is inside the signed subset). A later run that
//! finds them in the future can only mean the system clock was rolled
//! backward.

use crate::clock::Clock;
use crate::device::DeviceFingerprint;
use crate::payload::{
    ceil_days, format_ts, parse_ts, LicenseType, ValidationOutcome, ValidationReason,
    ValidationStatus,
};
use crate::signer::PayloadSigner;
use crate::store::LicenseStore;
use crate::trial::TrialManager;
use chrono::Duration;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Days past expiry during which `expired` is reported instead of a hard
/// block.
pub const GRACE_PERIOD_DAYS: i64 = 7;

/// Enforcement inputs supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct EnforcementOptions {
    /// School UID this installation belongs to, when known.
    pub expected_school_uid: Option<String>,
    /// Force `allowed` for internal accounts. Never mutates stored state
    /// and never masks the true outcome.
    pub programmer_bypass: bool,
}

/// The enforcement verdict derived from a validation outcome.
#[derive(Debug, Clone)]
pub struct EnforcementDecision {
    /// Whether the app may run.
    pub allowed: bool,
    /// Whether the caller should route the user into activation.
    pub activation_required: bool,
    /// The underlying outcome, unmasked.
    pub outcome: ValidationOutcome,
}

/// License validation service.
pub struct LicenseValidator {
    device: Arc<DeviceFingerprint>,
    store: Arc<LicenseStore>,
    trial: Arc<TrialManager>,
    signer: Arc<PayloadSigner>,
    clock: Arc<dyn Clock>,
    demo_mode: bool,
    last: Mutex<Option<ValidationOutcome>>,
}

impl LicenseValidator {
    /// Creates the validator. `demo_mode` is the host-supplied
    /// no-enforcement flag.
    #[must_use]
    pub fn new(
        device: Arc<DeviceFingerprint>,
        store: Arc<LicenseStore>,
        trial: Arc<TrialManager>,
        signer: Arc<PayloadSigner>,
        clock: Arc<dyn Clock>,
        demo_mode: bool,
    ) -> Self {
        Self {
            device,
            store,
            trial,
            signer,
            clock,
            demo_mode,
            last: Mutex::new(None),
        }
    }

    /// The most recent outcome, if any validation has run.
    #[must_use]
    pub fn last_outcome(&self) -> Option<ValidationOutcome> {
        self.last.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Runs the full validation pass.
    pub fn validate(&self, expected_school_uid: Option<&str>) -> ValidationOutcome {
        let outcome = self.evaluate(expected_school_uid);
        debug!(status = ?outcome.status, reason = ?outcome.reason, "validation outcome");
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = Some(outcome.clone());
        outcome
    }

    /// Maps a validation outcome to an allow/deny decision.
    pub fn enforce(&self, options: &EnforcementOptions) -> EnforcementDecision {
        let outcome = self.validate(options.expected_school_uid.as_deref());
        let mut allowed = outcome.status.is_allowed();
        if options.programmer_bypass && !allowed {
            warn!(status = ?outcome.status, "programmer bypass overriding enforcement");
            allowed = true;
        }
        let activation_required = matches!(
            outcome.status,
            ValidationStatus::Missing | ValidationStatus::Invalid
        );
        EnforcementDecision {
            allowed,
            activation_required,
            outcome,
        }
    }

    fn evaluate(&self, expected_school_uid: Option<&str>) -> ValidationOutcome {
        // 1. Host-level bypass short-circuits everything, no side effects.
        if self.demo_mode {
            return ValidationOutcome::new(ValidationStatus::Valid, ValidationReason::DemoMode);
        }

        let hwid = self.device.hwid();

        // 2. Nothing stored at all.
        if !self.store.exists() {
            return ValidationOutcome::new(
                ValidationStatus::Missing,
                ValidationReason::MissingLicense,
            )
            .with_trial_available(!self.trial.has_trial_been_used(&hwid));
        }

        // 3. Bytes exist but will not decrypt or parse.
        let Some(mut payload) = self.store.load() else {
            return ValidationOutcome::new(
                ValidationStatus::Invalid,
                ValidationReason::CorruptLicense,
            );
        };

        // 4. Signature integrity.
        if !self.signer.verify_license(&payload) {
            return ValidationOutcome::new(
                ValidationStatus::Invalid,
                ValidationReason::BadSignature,
            )
            .with_license(payload);
        }

        // 5. A template that was never bound is "missing", not an error.
        let Some(bound_hwid) = payload.device_fingerprint.clone() else {
            return ValidationOutcome::new(
                ValidationStatus::Missing,
                ValidationReason::AwaitingActivation,
            )
            .with_trial_available(!self.trial.has_trial_been_used(&hwid))
            .with_license(payload);
        };

        // 6. Genuine license, wrong machine. Harder than "invalid".
        if bound_hwid != hwid {
            return ValidationOutcome::new(
                ValidationStatus::Blocked,
                ValidationReason::HwidMismatch,
            )
            .with_license(payload);
        }

        // 7. Caller-supplied school identity.
        if let Some(expected) = expected_school_uid {
            if payload.school_uid != expected {
                return ValidationOutcome::new(
                    ValidationStatus::Invalid,
                    ValidationReason::SchoolMismatch,
                )
                .with_license(payload);
            }
        }

        let now = self.clock.now();

        // 8. Verification timestamps in the future mean the clock was
        // rolled backward since the last run.
        let newest_seen = [
            payload.last_verified_at.as_deref(),
            payload.last_checked_at.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter_map(parse_ts)
        .max();
        if let Some(seen) = newest_seen {
            if seen > now {
                warn!(%seen, %now, "clock rollback detected");
                return ValidationOutcome::new(
                    ValidationStatus::Blocked,
                    ValidationReason::ClockTamper,
                )
                .with_license(payload);
            }
        }

        // 9. Expiry and the grace window.
        let Some(expiry) = payload.effective_expiry() else {
            return ValidationOutcome::new(
                ValidationStatus::Invalid,
                ValidationReason::MalformedDate,
            )
            .with_license(payload);
        };
        let grace_deadline = expiry + Duration::days(GRACE_PERIOD_DAYS);
        if now > grace_deadline {
            return ValidationOutcome::new(
                ValidationStatus::Blocked,
                ValidationReason::GraceExpired,
            )
            .with_license(payload);
        }
        if now > expiry {
            return ValidationOutcome::new(ValidationStatus::Expired, ValidationReason::Grace)
                .with_grace_days_left(ceil_days(now, grace_deadline))
                .with_license(payload);
        }

        // 10. Valid. Advance the ratchet and persist best-effort; a
        // failed write degrades to "no persistence", not a failure.
        let now_ts = format_ts(now);
        payload.last_verified_at = Some(now_ts.clone());
        payload.last_checked_at = Some(now_ts);
        payload.signature = self.signer.sign_license(&payload);
        if let Err(err) = self.store.save(&payload, true) {
            warn!(%err, "could not persist verification timestamps");
        }

        match payload.license_type {
            LicenseType::Trial => {
                ValidationOutcome::new(ValidationStatus::Trial, ValidationReason::TrialActive)
                    .with_license(payload)
            }
            LicenseType::Paid => {
                ValidationOutcome::new(ValidationStatus::Valid, ValidationReason::LicenseValid)
                    .with_license(payload)
            }
        }
    }
}
