mod common;

use common::{env, paid_license, t0, SCHOOL, TEST_HWID};
use skolara_license::{
    parse_ts, LicenseError, LicenseType, ValidationStatus, TRIAL_DURATION_DAYS,
};
use skolara_storage::KeyValueStore;

// ── Issuance ─────────────────────────────────────────────────────

#[test]
fn trial_license_is_bound_and_spans_the_trial_window() {
    let env = env();
    let payload = env.licensing.create_trial_license(SCHOOL).unwrap();

    assert_eq!(payload.license_type, LicenseType::Trial);
    assert_eq!(payload.device_fingerprint.as_deref(), Some(TEST_HWID));
    assert_eq!(payload.school_uid, SCHOOL);

    let start = parse_ts(&payload.start_date).unwrap();
    let end = parse_ts(&payload.end_date).unwrap();
    assert_eq!(start, t0());
    assert_eq!((end - start).num_days(), TRIAL_DURATION_DAYS);
}

#[test]
fn trial_license_validates_as_trial() {
    let env = env();
    env.licensing.create_trial_license(SCHOOL).unwrap();
    let outcome = env.licensing.validate(None);
    assert_eq!(outcome.status, ValidationStatus::Trial);
}

#[test]
fn trial_is_signed_at_issuance() {
    let env = env();
    let payload = env.licensing.create_trial_license(SCHOOL).unwrap();
    assert!(common::signer().verify_license(&payload));
}

// ── Single-use semantics ─────────────────────────────────────────

#[test]
fn second_trial_on_same_device_fails() {
    let env = env();
    env.licensing.create_trial_license(SCHOOL).unwrap();
    let err = env.licensing.create_trial_license(SCHOOL).unwrap_err();
    assert!(matches!(err, LicenseError::TrialAlreadyUsed));
}

#[test]
fn trial_fails_when_any_license_exists() {
    let env = env();
    let payload = paid_license(SCHOOL, Some(TEST_HWID), t0(), 365);
    env.licensing.store().save(&payload, true).unwrap();

    let err = env.licensing.create_trial_license(SCHOOL).unwrap_err();
    assert!(matches!(err, LicenseError::LicenseAlreadyExists));
}

#[test]
fn trial_flag_survives_deleting_the_license() {
    let env = env();
    env.licensing.create_trial_license(SCHOOL).unwrap();

    // Wipe the license bytes from both locations.
    env.kv.remove("licensing", "license");
    env.dotfiles().remove("license");
    assert!(!env.licensing.store().exists());

    // The used-flag still reports from both stores.
    let err = env.licensing.create_trial_license(SCHOOL).unwrap_err();
    assert!(matches!(err, LicenseError::TrialAlreadyUsed));
}

#[test]
fn trial_flag_survives_clearing_the_kv_store() {
    let env = env();
    env.licensing.create_trial_license(SCHOOL).unwrap();

    // Clearing the entire kv scope leaves the dotfile flag; OR semantics
    // keep the trial consumed.
    env.kv.clear_scope("licensing");
    env.dotfiles().remove("license");
    assert!(env.licensing.trial().has_trial_been_used(TEST_HWID));

    let err = env.licensing.create_trial_license(SCHOOL).unwrap_err();
    assert!(matches!(err, LicenseError::TrialAlreadyUsed));
}

#[test]
fn trial_flag_survives_deleting_the_dotfile() {
    let env = env();
    env.licensing.create_trial_license(SCHOOL).unwrap();

    env.dotfiles().remove("trial");
    env.dotfiles().remove("license");
    env.kv.remove("licensing", "license");

    let err = env.licensing.create_trial_license(SCHOOL).unwrap_err();
    assert!(matches!(err, LicenseError::TrialAlreadyUsed));
}

#[test]
fn trial_availability_reflects_the_flag() {
    let env = env();
    assert!(!env.licensing.trial().has_trial_been_used(TEST_HWID));
    env.licensing.create_trial_license(SCHOOL).unwrap();
    assert!(env.licensing.trial().has_trial_been_used(TEST_HWID));

    // A different device's flag is independent.
    assert!(!env.licensing.trial().has_trial_been_used("unrelated-hwid"));
}
