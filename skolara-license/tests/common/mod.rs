//! Shared test helpers for licensing tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use skolara_crypto::StrongCrypto;
use skolara_license::{
    format_ts, Clock, FixedClock, KeyActivationContext, KeyKind, KeyRequest, LicensePayload,
    LicenseType, Licensing, LicensingConfig, PayloadSigner,
};
use skolara_storage::{HomeDotfiles, KeyValueStore, MemoryStore};
use std::sync::Arc;
use tempfile::TempDir;

/// HWID seeded into the store so the device service reads it instead of
/// probing the host.
pub const TEST_HWID: &str = "dGVzdC1od2lkLXNlZ21lbnQx";

/// HWID of "some other machine".
pub const OTHER_HWID: &str = "b3RoZXItaHdpZC1zZWdtZW50";

pub const SCHOOL: &str = "school-7f3a";

/// A fully wired subsystem over a memory store, a temp-dir dotfile port,
/// strong crypto, and a pinned clock.
pub struct TestEnv {
    pub dir: TempDir,
    pub kv: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub licensing: Licensing,
}

/// The pinned start instant for every test clock.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn env() -> TestEnv {
    env_with(TEST_HWID, false)
}

pub fn env_demo() -> TestEnv {
    env_with(TEST_HWID, true)
}

pub fn env_with(hwid: &str, enforcement_disabled: bool) -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let kv = Arc::new(MemoryStore::new());
    kv.set("licensing", "hwid", hwid);
    let clock = Arc::new(FixedClock::at(t0()));

    let config = LicensingConfig {
        enforcement_disabled,
        ..LicensingConfig::default()
    };
    let licensing = Licensing::new(
        config,
        kv.clone() as Arc<dyn KeyValueStore>,
        Some(HomeDotfiles::open_in(dir.path(), "skolara")),
        Arc::new(StrongCrypto::new()),
        clock.clone() as Arc<dyn Clock>,
    );

    TestEnv {
        dir,
        kv,
        clock,
        licensing,
    }
}

impl TestEnv {
    /// A second handle on the dotfile port, for direct manipulation.
    pub fn dotfiles(&self) -> HomeDotfiles {
        HomeDotfiles::open_in(self.dir.path(), "skolara")
    }
}

/// A signer over the same embedded secret the subsystem uses.
pub fn signer() -> PayloadSigner {
    PayloadSigner::new(Arc::new(StrongCrypto::new()))
}

/// Builds a signed paid license bound to `hwid`, valid for `days` from
/// `start`.
pub fn paid_license(school: &str, hwid: Option<&str>, start: DateTime<Utc>, days: i64) -> LicensePayload {
    let mut payload = LicensePayload {
        school_uid: school.to_string(),
        device_fingerprint: hwid.map(String::from),
        license_type: LicenseType::Paid,
        start_date: format_ts(start),
        end_date: format_ts(start + Duration::days(days)),
        expires_at: None,
        activated_at: Some(format_ts(start)),
        status: Some("active".to_string()),
        install_fingerprint: None,
        last_verified_at: Some(format_ts(start)),
        last_checked_at: Some(format_ts(start)),
        signature: String::new(),
    };
    payload.signature = signer().sign_license(&payload);
    payload
}

/// A standard key request for `SCHOOL`.
pub fn key_request(kind: KeyKind) -> KeyRequest {
    KeyRequest {
        school_name: "Riverbend Academy".to_string(),
        school_code: Some("RBA".to_string()),
        school_uid: Some(SCHOOL.to_string()),
        kind,
        duration_days: Some(180),
        expires_at: None,
        max_devices: None,
        issued_by: "admin@skolara".to_string(),
    }
}

/// A standard redemption context on the test device.
pub fn activation_ctx() -> KeyActivationContext {
    KeyActivationContext {
        school_uid: SCHOOL.to_string(),
        hwid: TEST_HWID.to_string(),
        internal_device: false,
        allow_programmer_bypass: false,
    }
}
