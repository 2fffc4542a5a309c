mod common;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Duration;
use common::{
    activation_ctx, env, key_request, paid_license, signer, t0, OTHER_HWID, SCHOOL, TEST_HWID,
};
use skolara_license::{
    format_ts, KeyKind, LicenseError, LicenseType, ValidationStatus,
};

// ── Key redemption ───────────────────────────────────────────────

#[test]
fn redeeming_a_key_installs_a_valid_license() {
    let env = env();
    let key = env
        .licensing
        .key_factory()
        .generate(&key_request(KeyKind::Paid))
        .unwrap();

    let (license, redeemed) = env
        .licensing
        .activate_license_key(&key, &activation_ctx())
        .unwrap();

    assert_eq!(license.license_type, LicenseType::Paid);
    assert_eq!(license.device_fingerprint.as_deref(), Some(TEST_HWID));
    assert_eq!(license.start_date, format_ts(t0()));
    assert_eq!(license.end_date, format_ts(t0() + Duration::days(180)));

    assert!(redeemed.activated);
    assert_eq!(redeemed.bound_hwid.as_deref(), Some(TEST_HWID));
    assert_eq!(redeemed.activated_at.as_deref(), Some(format_ts(t0()).as_str()));

    assert_eq!(env.licensing.validate(None).status, ValidationStatus::Valid);
}

#[test]
fn trial_extension_key_installs_a_trial() {
    let env = env();
    let key = env
        .licensing
        .key_factory()
        .generate(&key_request(KeyKind::TrialExtension))
        .unwrap();

    let (license, _) = env
        .licensing
        .activate_license_key(&key, &activation_ctx())
        .unwrap();
    assert_eq!(license.license_type, LicenseType::Trial);
    assert_eq!(env.licensing.validate(None).status, ValidationStatus::Trial);
}

#[test]
fn tampered_key_is_rejected() {
    let env = env();
    let mut key = env
        .licensing
        .key_factory()
        .generate(&key_request(KeyKind::Paid))
        .unwrap();
    key.duration_days = 10_000;

    let err = env
        .licensing
        .activate_license_key(&key, &activation_ctx())
        .unwrap_err();
    assert!(matches!(err, LicenseError::BadSignature));
}

#[test]
fn revoked_key_is_rejected() {
    let env = env();
    let mut key = env
        .licensing
        .key_factory()
        .generate(&key_request(KeyKind::Paid))
        .unwrap();
    key.revoked = true;

    let err = env
        .licensing
        .activate_license_key(&key, &activation_ctx())
        .unwrap_err();
    assert!(matches!(err, LicenseError::KeyRevoked));
}

#[test]
fn key_activated_elsewhere_is_rejected() {
    let env = env();
    let mut key = env
        .licensing
        .key_factory()
        .generate(&key_request(KeyKind::Paid))
        .unwrap();
    key.activated = true;
    key.bound_hwid = Some(OTHER_HWID.to_string());

    let err = env
        .licensing
        .activate_license_key(&key, &activation_ctx())
        .unwrap_err();
    assert!(matches!(err, LicenseError::KeyBoundElsewhere));
}

#[test]
fn key_redemption_is_strictly_single_use() {
    let env = env();
    let key = env
        .licensing
        .key_factory()
        .generate(&key_request(KeyKind::Paid))
        .unwrap();
    let (_, redeemed) = env
        .licensing
        .activate_license_key(&key, &activation_ctx())
        .unwrap();

    // Re-redeeming on the very same device is rejected, not idempotent:
    // reuse is a bug to surface.
    let err = env
        .licensing
        .activate_license_key(&redeemed, &activation_ctx())
        .unwrap_err();
    assert!(matches!(err, LicenseError::KeyAlreadyActivated));
}

#[test]
fn expired_key_is_rejected() {
    let env = env();
    let mut request = key_request(KeyKind::Paid);
    request.expires_at = Some(format_ts(t0() + Duration::days(5)));
    let key = env.licensing.key_factory().generate(&request).unwrap();

    env.clock.advance_days(6);
    let err = env
        .licensing
        .activate_license_key(&key, &activation_ctx())
        .unwrap_err();
    assert!(matches!(err, LicenseError::KeyExpired(_)));
}

#[test]
fn internal_device_requires_explicit_bypass() {
    let env = env();
    let key = env
        .licensing
        .key_factory()
        .generate(&key_request(KeyKind::Paid))
        .unwrap();

    let mut ctx = activation_ctx();
    ctx.internal_device = true;
    let err = env
        .licensing
        .activate_license_key(&key, &ctx)
        .unwrap_err();
    assert!(matches!(err, LicenseError::InternalDeviceBlocked));

    ctx.allow_programmer_bypass = true;
    assert!(env.licensing.activate_license_key(&key, &ctx).is_ok());
}

#[test]
fn key_restricted_to_another_school_is_rejected() {
    let env = env();
    let key = env
        .licensing
        .key_factory()
        .generate(&key_request(KeyKind::Paid))
        .unwrap();

    let mut ctx = activation_ctx();
    ctx.school_uid = "some-other-school".to_string();
    let err = env
        .licensing
        .activate_license_key(&key, &ctx)
        .unwrap_err();
    assert!(matches!(err, LicenseError::SchoolMismatch { .. }));
}

#[test]
fn unrestricted_key_adopts_the_context_school() {
    let env = env();
    let mut request = key_request(KeyKind::Paid);
    request.school_uid = None;
    let key = env.licensing.key_factory().generate(&request).unwrap();

    let (license, _) = env
        .licensing
        .activate_license_key(&key, &activation_ctx())
        .unwrap();
    assert_eq!(license.school_uid, SCHOOL);
}

#[test]
fn redeeming_replaces_an_existing_license() {
    let env = env();
    env.licensing.create_trial_license(SCHOOL).unwrap();
    assert_eq!(env.licensing.validate(None).status, ValidationStatus::Trial);

    let key = env
        .licensing
        .key_factory()
        .generate(&key_request(KeyKind::Paid))
        .unwrap();
    env.licensing
        .activate_license_key(&key, &activation_ctx())
        .unwrap();
    assert_eq!(env.licensing.validate(None).status, ValidationStatus::Valid);
}

// ── Pre-issued payload activation ────────────────────────────────

#[test]
fn unbound_payload_binds_to_this_device() {
    let env = env();
    let template = paid_license(SCHOOL, None, t0(), 365);
    let text = serde_json::to_string(&template).unwrap();

    let installed = env
        .licensing
        .activate_offline_license(&text, SCHOOL)
        .unwrap();
    assert_eq!(installed.device_fingerprint.as_deref(), Some(TEST_HWID));
    assert!(signer().verify_license(&installed));
    assert_eq!(env.licensing.validate(None).status, ValidationStatus::Valid);
}

#[test]
fn base64_wrapped_payload_is_accepted() {
    let env = env();
    let template = paid_license(SCHOOL, None, t0(), 365);
    let text = BASE64.encode(serde_json::to_string(&template).unwrap());

    let installed = env
        .licensing
        .activate_offline_license(&text, SCHOOL)
        .unwrap();
    assert_eq!(env.licensing.validate(None).status, ValidationStatus::Valid);
    assert_eq!(installed.school_uid, SCHOOL);
}

#[test]
fn payload_bound_to_this_device_activates() {
    let env = env();
    let bound = paid_license(SCHOOL, Some(TEST_HWID), t0(), 365);
    let text = serde_json::to_string(&bound).unwrap();

    assert!(env.licensing.activate_offline_license(&text, SCHOOL).is_ok());
}

#[test]
fn payload_bound_to_another_device_is_rejected() {
    let env = env();
    let foreign = paid_license(SCHOOL, Some(OTHER_HWID), t0(), 365);
    let text = serde_json::to_string(&foreign).unwrap();

    let err = env
        .licensing
        .activate_offline_license(&text, SCHOOL)
        .unwrap_err();
    assert!(matches!(err, LicenseError::HwidMismatch));
}

#[test]
fn wrong_school_payload_is_rejected() {
    let env = env();
    let template = paid_license("another-school", None, t0(), 365);
    let text = serde_json::to_string(&template).unwrap();

    let err = env
        .licensing
        .activate_offline_license(&text, SCHOOL)
        .unwrap_err();
    assert!(matches!(err, LicenseError::SchoolMismatch { .. }));
}

#[test]
fn expired_payload_is_rejected() {
    let env = env();
    let template = paid_license(SCHOOL, None, t0() - Duration::days(400), 365);
    let text = serde_json::to_string(&template).unwrap();

    let err = env
        .licensing
        .activate_offline_license(&text, SCHOOL)
        .unwrap_err();
    assert!(matches!(err, LicenseError::Expired(_)));
}

#[test]
fn tampered_payload_is_rejected() {
    let env = env();
    let mut template = paid_license(SCHOOL, None, t0(), 365);
    template.end_date = format_ts(t0() + Duration::days(10_000));
    let text = serde_json::to_string(&template).unwrap();

    let err = env
        .licensing
        .activate_offline_license(&text, SCHOOL)
        .unwrap_err();
    assert!(matches!(err, LicenseError::BadSignature));
}

#[test]
fn garbage_text_is_unreadable() {
    let env = env();
    let err = env
        .licensing
        .activate_offline_license("certainly not a license", SCHOOL)
        .unwrap_err();
    assert!(matches!(err, LicenseError::UnreadablePayload(_)));

    let err = env
        .licensing
        .activate_offline_license(&BASE64.encode("still not json"), SCHOOL)
        .unwrap_err();
    assert!(matches!(err, LicenseError::UnreadablePayload(_)));
}

#[test]
fn malformed_dates_are_rejected() {
    let env = env();
    let mut template = paid_license(SCHOOL, None, t0(), 365);
    template.end_date = "when the term ends".to_string();
    template.signature = signer().sign_license(&template);
    let text = serde_json::to_string(&template).unwrap();

    let err = env
        .licensing
        .activate_offline_license(&text, SCHOOL)
        .unwrap_err();
    assert!(matches!(err, LicenseError::MalformedDate(_)));
}
