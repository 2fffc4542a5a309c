//! Offline activation: redeeming a key or a pre-issued payload into a
//! bound license.
//!
//! Both paths end the same way: a signed `LicensePayload` bound to this
//! device's HWID, persisted through the license store with
//! `allow_update`.

use crate::clock::Clock;
use crate::device::DeviceFingerprint;
use crate::error::{LicenseError, LicenseResult};
use crate::install::InstallFingerprint;
use crate::payload::{format_ts, parse_ts, LicenseKeyPayload, LicensePayload};
use crate::signer::PayloadSigner;
use crate::store::LicenseStore;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Duration;
use std::sync::Arc;
use tracing::debug;

/// Context for redeeming a license key on this device.
#[derive(Debug, Clone)]
pub struct KeyActivationContext {
    /// UID of the activating school.
    pub school_uid: String,
    /// HWID of the activating device.
    pub hwid: String,
    /// Set by the host when this is an internal/admin machine; such
    /// machines must not consume distributable keys.
    pub internal_device: bool,
    /// Explicit override allowing an internal machine to redeem anyway.
    pub allow_programmer_bypass: bool,
}

/// Redeems keys and pre-issued payloads into bound licenses.
pub struct OfflineActivationService {
    signer: Arc<PayloadSigner>,
    store: Arc<LicenseStore>,
    device: Arc<DeviceFingerprint>,
    install: Arc<InstallFingerprint>,
    clock: Arc<dyn Clock>,
}

impl OfflineActivationService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        signer: Arc<PayloadSigner>,
        store: Arc<LicenseStore>,
        device: Arc<DeviceFingerprint>,
        install: Arc<InstallFingerprint>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            signer,
            store,
            device,
            install,
            clock,
        }
    }

    /// Redeems a license key into a bound license.
    ///
    /// Rejection order: bad signature, revoked, redeemed on another
    /// device, redeemed on this device (keys are strictly single-use,
    /// not idempotent), key expired, internal device without bypass.
    ///
    /// On success, returns the persisted license and the key flipped to
    /// activated with the HWID recorded; the caller (admin tooling)
    /// writes the updated key back to its registry.
    ///
    /// # Errors
    ///
    /// See rejection order above, plus `Storage` when persistence fails
    /// entirely.
    pub fn activate_license_key(
        &self,
        key: &LicenseKeyPayload,
        ctx: &KeyActivationContext,
    ) -> LicenseResult<(LicensePayload, LicenseKeyPayload)> {
        if !self.signer.verify_key(key) {
            return Err(LicenseError::BadSignature);
        }
        if key.revoked {
            return Err(LicenseError::KeyRevoked);
        }
        if key.activated {
            return if key.bound_hwid.as_deref() == Some(ctx.hwid.as_str()) {
                Err(LicenseError::KeyAlreadyActivated)
            } else {
                Err(LicenseError::KeyBoundElsewhere)
            };
        }
        let now = self.clock.now();
        if let Some(raw) = &key.expires_at {
            let expiry =
                parse_ts(raw).ok_or_else(|| LicenseError::MalformedDate(raw.clone()))?;
            if now > expiry {
                return Err(LicenseError::KeyExpired(raw.clone()));
            }
        }
        if ctx.internal_device && !ctx.allow_programmer_bypass {
            return Err(LicenseError::InternalDeviceBlocked);
        }
        if let Some(key_school) = &key.school_uid {
            if key_school != &ctx.school_uid {
                return Err(LicenseError::SchoolMismatch {
                    expected: ctx.school_uid.clone(),
                    found: key_school.clone(),
                });
            }
        }

        let now_ts = format_ts(now);
        let mut license = LicensePayload {
            school_uid: ctx.school_uid.clone(),
            device_fingerprint: Some(ctx.hwid.clone()),
            license_type: key.license_type.license_type(),
            start_date: now_ts.clone(),
            end_date: format_ts(now + Duration::days(key.duration_days)),
            expires_at: None,
            activated_at: Some(now_ts.clone()),
            status: Some("active".to_string()),
            install_fingerprint: Some(self.install.ensure()),
            last_verified_at: Some(now_ts.clone()),
            last_checked_at: Some(now_ts.clone()),
            signature: String::new(),
        };
        license.signature = self.signer.sign_license(&license);
        self.store.save(&license, true)?;

        let mut redeemed = key.clone();
        redeemed.activated = true;
        redeemed.activated_at = Some(now_ts.clone());
        redeemed.bound_hwid = Some(ctx.hwid.clone());
        debug!(license_key = %redeemed.license_key, "license key redeemed");
        Ok((license, redeemed))
    }

    /// Activates a pre-issued license payload pasted or imported as text.
    ///
    /// Decoding is tolerant: raw JSON first, then base64-wrapped JSON.
    /// An unbound payload binds to this device and is re-signed; a bound
    /// payload must already match this device.
    ///
    /// # Errors
    ///
    /// `UnreadablePayload`, `BadSignature`, `SchoolMismatch`,
    /// `MalformedDate`, `Expired`, `HwidMismatch`, or `Storage`.
    pub fn activate_offline_license(
        &self,
        raw_text: &str,
        expected_school_uid: &str,
    ) -> LicenseResult<LicensePayload> {
        let mut payload = decode_payload(raw_text)?;

        if !self.signer.verify_license(&payload) {
            return Err(LicenseError::BadSignature);
        }
        if payload.school_uid != expected_school_uid {
            return Err(LicenseError::SchoolMismatch {
                expected: expected_school_uid.to_string(),
                found: payload.school_uid.clone(),
            });
        }
        if parse_ts(&payload.start_date).is_none() {
            return Err(LicenseError::MalformedDate(payload.start_date.clone()));
        }
        let Some(end) = parse_ts(&payload.end_date) else {
            return Err(LicenseError::MalformedDate(payload.end_date.clone()));
        };
        let now = self.clock.now();
        if now > end {
            return Err(LicenseError::Expired(payload.end_date.clone()));
        }

        let hwid = self.device.hwid();
        match payload.device_fingerprint.as_deref() {
            None => {
                payload.device_fingerprint = Some(hwid);
            }
            Some(bound) if bound != hwid => {
                return Err(LicenseError::HwidMismatch);
            }
            Some(_) => {}
        }

        let now_ts = format_ts(now);
        payload.activated_at.get_or_insert(now_ts.clone());
        payload.status = Some("active".to_string());
        payload.install_fingerprint = Some(self.install.ensure());
        payload.last_verified_at = Some(now_ts.clone());
        payload.last_checked_at = Some(now_ts);
        payload.signature = self.signer.sign_license(&payload);

        self.store.save(&payload, true)?;
        debug!(school_uid = %payload.school_uid, "offline license activated");
        Ok(payload)
    }
}

/// Tolerant payload decode: raw JSON, else base64(JSON).
fn decode_payload(raw_text: &str) -> LicenseResult<LicensePayload> {
    let trimmed = raw_text.trim();
    if let Ok(payload) = serde_json::from_str::<LicensePayload>(trimmed) {
        return Ok(payload);
    }
    let bytes = BASE64
        .decode(trimmed)
        .map_err(|e| LicenseError::UnreadablePayload(format!("not JSON or base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| LicenseError::UnreadablePayload(format!("decoded bytes are not a license: {e}")))
}
