mod common;

use common::{env, paid_license, t0, SCHOOL, TEST_HWID};
use skolara_license::InstallIntegrity;
use skolara_storage::KeyValueStore;

// ── ensure() ─────────────────────────────────────────────────────

#[test]
fn ensure_generates_once_and_is_stable() {
    let env = env();
    let first = env.licensing.ensure_install_fingerprint();
    let second = env.licensing.ensure_install_fingerprint();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn ensure_writes_both_copies() {
    let env = env();
    let id = env.licensing.ensure_install_fingerprint();
    assert_eq!(
        env.kv.get("licensing", "install_fingerprint").as_deref(),
        Some(id.as_str())
    );
    assert_eq!(env.dotfiles().read("install").as_deref(), Some(id.as_str()));
}

#[test]
fn ensure_backfills_a_missing_copy() {
    let env = env();
    let id = env.licensing.ensure_install_fingerprint();

    env.kv.remove("licensing", "install_fingerprint");
    let again = env.licensing.ensure_install_fingerprint();
    assert_eq!(again, id);
    assert_eq!(
        env.kv.get("licensing", "install_fingerprint").as_deref(),
        Some(id.as_str())
    );
}

// ── validate_integrity() ─────────────────────────────────────────

#[test]
fn matching_copies_are_ok() {
    let env = env();
    env.licensing.ensure_install_fingerprint();
    assert_eq!(env.licensing.install_integrity(), InstallIntegrity::Ok);
}

#[test]
fn divergent_copies_mean_clone() {
    let env = env();
    env.licensing.ensure_install_fingerprint();
    env.dotfiles().write("install", "fingerprint-from-another-machine");
    assert_eq!(
        env.licensing.install_integrity(),
        InstallIntegrity::CloneDetected
    );
}

#[test]
fn license_referencing_a_stale_fingerprint_means_reset() {
    let env = env();
    env.licensing.ensure_install_fingerprint();

    // A license recorded under a third, older fingerprint while the
    // current copies agree: local state was wiped and regenerated.
    let mut payload = paid_license(SCHOOL, Some(TEST_HWID), t0(), 365);
    payload.install_fingerprint = Some("stale-install-fingerprint".to_string());
    payload.signature = common::signer().sign_license(&payload);
    env.licensing.store().save(&payload, true).unwrap();

    assert_eq!(
        env.licensing.install_integrity(),
        InstallIntegrity::ResetDetected
    );
}

#[test]
fn integrity_self_heals_a_missing_copy() {
    let env = env();
    let id = env.licensing.ensure_install_fingerprint();

    env.dotfiles().remove("install");
    assert_eq!(env.licensing.install_integrity(), InstallIntegrity::Ok);
    assert_eq!(env.dotfiles().read("install").as_deref(), Some(id.as_str()));
}

#[test]
fn clone_wins_over_reset() {
    let env = env();
    env.licensing.ensure_install_fingerprint();

    let mut payload = paid_license(SCHOOL, Some(TEST_HWID), t0(), 365);
    payload.install_fingerprint = Some("stale-install-fingerprint".to_string());
    payload.signature = common::signer().sign_license(&payload);
    env.licensing.store().save(&payload, true).unwrap();

    env.dotfiles().write("install", "fingerprint-from-another-machine");
    assert_eq!(
        env.licensing.install_integrity(),
        InstallIntegrity::CloneDetected
    );
}

#[test]
fn trial_issuance_records_the_install_fingerprint() {
    let env = env();
    let id = env.licensing.ensure_install_fingerprint();
    let payload = env.licensing.create_trial_license(SCHOOL).unwrap();
    assert_eq!(payload.install_fingerprint.as_deref(), Some(id.as_str()));
    assert_eq!(env.licensing.install_integrity(), InstallIntegrity::Ok);
}
