//! License data model.
//!
//! Two distinct credential shapes live here:
//!
//! - [`LicensePayload`] — the end-user license bound (or about to be
//!   bound) to one device.
//! - [`LicenseKeyPayload`] — the admin-issued, human-enterable,
//!   single-use redeemable credential. Redeeming a key *produces* a bound
//!   `LicensePayload`; the two never merge.
//!
//! Date fields are RFC 3339 strings rather than typed timestamps: the
//! HMAC canonicalization signs the exact stored bytes, and a string field
//! cannot drift through serialization normalization.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// The kind of end-user license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseType {
    /// Limited-time evaluation, one per device ever.
    Trial,
    /// Paid license.
    Paid,
}

impl LicenseType {
    /// Canonical wire string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Paid => "paid",
        }
    }
}

/// The kind of distributable license key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Redeems into a paid license.
    Paid,
    /// Redeems into a trial license with the key's duration.
    #[serde(rename = "trial-extension")]
    TrialExtension,
}

impl KeyKind {
    /// Canonical wire string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::TrialExtension => "trial-extension",
        }
    }

    /// The license type a key of this kind redeems into.
    #[must_use]
    pub fn license_type(&self) -> LicenseType {
        match self {
            Self::Paid => LicenseType::Paid,
            Self::TrialExtension => LicenseType::Trial,
        }
    }
}

/// A bound (or unbound template) end-user license.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicensePayload {
    /// UID of the licensed school.
    pub school_uid: String,
    /// HWID this license is bound to; `None` for a pre-issued template
    /// awaiting activation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_fingerprint: Option<String>,
    /// Trial or paid.
    pub license_type: LicenseType,
    /// Validity start, RFC 3339.
    pub start_date: String,
    /// Validity end, RFC 3339.
    pub end_date: String,
    /// Optional expiry override; effective expiry is this field when set,
    /// `end_date` otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// When the license was activated on this device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<String>,
    /// Free-form status marker (e.g. "active").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Install fingerprint observed at issuance; used by the integrity
    /// check to detect a wiped installation with a lingering license.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_fingerprint: Option<String>,
    /// Last successful validation; signed, so rolling the clock back past
    /// it is detectable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verified_at: Option<String>,
    /// Last validation attempt; refreshable without re-signing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<String>,
    /// HMAC over the canonical subset.
    #[serde(default)]
    pub signature: String,
}

impl LicensePayload {
    /// True once the license is bound to a device.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.device_fingerprint.is_some()
    }

    /// The instant this license stops being valid, if parseable.
    #[must_use]
    pub fn effective_expiry(&self) -> Option<DateTime<Utc>> {
        let raw = self.expires_at.as_deref().unwrap_or(&self.end_date);
        parse_ts(raw)
    }

    /// Canonical signing subset, fixed order. `last_checked_at` is
    /// deliberately outside so it can refresh without re-signing;
    /// `last_verified_at` is inside, and the validator re-signs when it
    /// advances it.
    #[must_use]
    pub fn canonical(&self) -> String {
        [
            self.school_uid.as_str(),
            self.device_fingerprint.as_deref().unwrap_or(""),
            self.license_type.as_str(),
            self.start_date.as_str(),
            self.end_date.as_str(),
            self.last_verified_at.as_deref().unwrap_or(""),
        ]
        .join("|")
    }
}

/// A distributable, admin-issued license key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseKeyPayload {
    /// Human-enterable key text, `XXXX-XXXX-XXXX-XXXX`.
    pub license_key: String,
    /// Display name of the school this key was issued for.
    pub school_name: String,
    /// Optional short school code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_code: Option<String>,
    /// Optional school UID the key is restricted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_uid: Option<String>,
    /// What the key redeems into.
    pub license_type: KeyKind,
    /// Duration of the produced license, in days from redemption.
    pub duration_days: i64,
    /// Device budget for the produced license.
    pub max_devices: u32,
    /// Issuance instant, RFC 3339.
    pub issued_at: String,
    /// Redemption deadline; unredeemed keys expire, derived at listing
    /// time, never stored as a status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Issuing admin identity.
    pub issued_by: String,
    /// Redemption flag; keys are strictly single-use.
    #[serde(default)]
    pub activated: bool,
    /// When the key was redeemed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<String>,
    /// HWID the key was redeemed on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_hwid: Option<String>,
    /// Revocation flag set by admin tooling.
    #[serde(default)]
    pub revoked: bool,
    /// HMAC over the canonical subset.
    #[serde(default)]
    pub signature: String,
}

impl LicenseKeyPayload {
    /// Canonical signing subset, fixed order. Mutable redemption state
    /// (`activated`, `activated_at`, `bound_hwid`, `revoked`) is excluded
    /// so the signature survives the unused→activated transition.
    #[must_use]
    pub fn canonical(&self) -> String {
        let duration_days = self.duration_days.to_string();
        let max_devices = self.max_devices.to_string();
        [
            self.license_key.as_str(),
            self.school_name.as_str(),
            self.school_code.as_deref().unwrap_or(""),
            self.school_uid.as_deref().unwrap_or(""),
            self.license_type.as_str(),
            duration_days.as_str(),
            max_devices.as_str(),
            self.issued_at.as_str(),
            self.expires_at.as_deref().unwrap_or(""),
            self.issued_by.as_str(),
        ]
        .join("|")
    }

    /// Derived key status at `now`. Priority: revoked > activated >
    /// expired > unused.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> KeyStatus {
        if self.revoked {
            return KeyStatus::Revoked;
        }
        if self.activated {
            return KeyStatus::Activated;
        }
        if let Some(exp) = self.expires_at.as_deref().and_then(parse_ts) {
            if now > exp {
                return KeyStatus::Expired;
            }
        }
        KeyStatus::Unused
    }
}

/// Derived status of an issued key. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    /// Revoked by the issuer; terminal.
    Revoked,
    /// Redeemed; terminal.
    Activated,
    /// Redemption deadline passed before use.
    Expired,
    /// Issued and still redeemable.
    Unused,
}

/// Validator state. Ordered from hardest failure to full validity; the
/// validator reports the first matching state, so a license that is both
/// foreign and expired reports the binding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    /// No license stored (or an unbound template awaiting activation).
    Missing,
    /// Stored bytes exist but fail integrity (corrupt, bad signature,
    /// wrong school, malformed dates).
    Invalid,
    /// Hard policy failure: foreign device, clock rollback, grace window
    /// exhausted.
    Blocked,
    /// Past expiry but inside the grace window; callers may treat this as
    /// read-only rather than a hard stop.
    Expired,
    /// Valid trial license.
    Trial,
    /// Valid paid license.
    Valid,
}

impl ValidationStatus {
    /// True when the subsystem authorizes the app to run.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Valid | Self::Trial)
    }
}

/// The specific reason behind a validation status, for per-reason
/// messaging at the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    /// Enforcement bypass flag set by the host.
    DemoMode,
    /// No stored license bytes.
    MissingLicense,
    /// Stored bytes would not decrypt or parse.
    CorruptLicense,
    /// HMAC verification failed.
    BadSignature,
    /// Unbound template present; activation still required.
    AwaitingActivation,
    /// License is genuine but bound to another machine.
    HwidMismatch,
    /// License names a different school.
    SchoolMismatch,
    /// Verification timestamps are in the future; the clock was rolled
    /// back.
    ClockTamper,
    /// Grace window after expiry is exhausted.
    GraceExpired,
    /// Past expiry, inside the grace window.
    Grace,
    /// A date field would not parse.
    MalformedDate,
    /// Valid trial.
    TrialActive,
    /// Valid paid license.
    LicenseValid,
}

/// The full result of a validation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Resulting state.
    pub status: ValidationStatus,
    /// Specific reason for the state.
    pub reason: ValidationReason,
    /// The decoded license, when one was readable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<LicensePayload>,
    /// Whether a trial can still be started; reported with `missing`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_available: Option<bool>,
    /// Whole days left in the grace window; reported with `expired`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_days_left: Option<i64>,
}

impl ValidationOutcome {
    /// Creates an outcome with no attachments.
    #[must_use]
    pub fn new(status: ValidationStatus, reason: ValidationReason) -> Self {
        Self {
            status,
            reason,
            license: None,
            trial_available: None,
            grace_days_left: None,
        }
    }

    /// Attaches the decoded license.
    #[must_use]
    pub fn with_license(mut self, license: LicensePayload) -> Self {
        self.license = Some(license);
        self
    }

    /// Attaches trial availability.
    #[must_use]
    pub fn with_trial_available(mut self, available: bool) -> Self {
        self.trial_available = Some(available);
        self
    }

    /// Attaches remaining grace days.
    #[must_use]
    pub fn with_grace_days_left(mut self, days: i64) -> Self {
        self.grace_days_left = Some(days);
        self
    }
}

/// Result of the install-fingerprint integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallIntegrity {
    /// Redundant copies agree (after healing any missing one).
    Ok,
    /// Local state was wiped while an old license lingers.
    ResetDetected,
    /// The redundant copies disagree; storage was cloned between
    /// machines.
    CloneDetected,
}

// ── Timestamp helpers ────────────────────────────────────────────

/// Formats an instant as the subsystem's RFC 3339 wire form
/// (second precision, `Z` offset).
#[must_use]
pub fn format_ts(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses an RFC 3339 string. `None` on any malformation.
#[must_use]
pub fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Days between two instants, rounded up; zero when `until <= from`.
#[must_use]
pub fn ceil_days(from: DateTime<Utc>, until: DateTime<Utc>) -> i64 {
    let secs = (until - from).num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs + 86_399) / 86_400
    }
}
