//! Trial issuance and the per-device trial flag.
//!
//! The used-flag is stored redundantly (key-value store + dotfile) with
//! OR semantics: clearing one location does not reset the flag. Exactly
//! one trial per device, ever.

use crate::clock::Clock;
use crate::error::{LicenseError, LicenseResult};
use crate::install::InstallFingerprint;
use crate::payload::{format_ts, LicensePayload, LicenseType};
use crate::signer::PayloadSigner;
use crate::store::LicenseStore;
use chrono::Duration;
use skolara_storage::{HomeDotfiles, KeyValueStore};
use std::sync::Arc;
use tracing::debug;

/// Trial length in days.
pub const TRIAL_DURATION_DAYS: i64 = 14;

const DOTFILE: &str = "trial";

/// Issues trial licenses and tracks trial consumption per device.
pub struct TrialManager {
    kv: Arc<dyn KeyValueStore>,
    files: Option<HomeDotfiles>,
    scope: String,
    signer: Arc<PayloadSigner>,
    store: Arc<LicenseStore>,
    install: Arc<InstallFingerprint>,
    clock: Arc<dyn Clock>,
}

impl TrialManager {
    /// Creates the manager.
    #[must_use]
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        files: Option<HomeDotfiles>,
        scope: &str,
        signer: Arc<PayloadSigner>,
        store: Arc<LicenseStore>,
        install: Arc<InstallFingerprint>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            kv,
            files,
            scope: scope.to_string(),
            signer,
            store,
            install,
            clock,
        }
    }

    fn kv_flag_key(hwid: &str) -> String {
        format!("trial_used:{hwid}")
    }

    /// True when either redundant store reports the trial as used on this
    /// device.
    #[must_use]
    pub fn has_trial_been_used(&self, hwid: &str) -> bool {
        let kv_used = self
            .kv
            .get(&self.scope, &Self::kv_flag_key(hwid))
            .is_some();
        let file_used = self
            .files
            .as_ref()
            .and_then(|f| f.read(DOTFILE))
            .map(|contents| contents.lines().any(|line| line.trim() == hwid))
            .unwrap_or(false);
        kv_used || file_used
    }

    /// Records trial consumption in both stores.
    fn mark_trial_used(&self, hwid: &str) {
        self.kv.set(&self.scope, &Self::kv_flag_key(hwid), "1");
        if let Some(files) = &self.files {
            let mut contents = files.read(DOTFILE).unwrap_or_default();
            if !contents.lines().any(|line| line.trim() == hwid) {
                if !contents.is_empty() {
                    contents.push('\n');
                }
                contents.push_str(hwid);
                files.write(DOTFILE, &contents);
            }
        }
    }

    /// Issues the one-and-only trial license for this device.
    ///
    /// # Errors
    ///
    /// `TrialAlreadyUsed` when either flag store reports consumption;
    /// `LicenseAlreadyExists` when any license (trial or paid) is already
    /// installed.
    pub fn create_trial_license(
        &self,
        school_uid: &str,
        hwid: &str,
    ) -> LicenseResult<LicensePayload> {
        if self.has_trial_been_used(hwid) {
            return Err(LicenseError::TrialAlreadyUsed);
        }
        if self.store.exists() {
            return Err(LicenseError::LicenseAlreadyExists);
        }

        let now = self.clock.now();
        let now_ts = format_ts(now);
        let mut payload = LicensePayload {
            school_uid: school_uid.to_string(),
            device_fingerprint: Some(hwid.to_string()),
            license_type: LicenseType::Trial,
            start_date: now_ts.clone(),
            end_date: format_ts(now + Duration::days(TRIAL_DURATION_DAYS)),
            expires_at: None,
            activated_at: Some(now_ts.clone()),
            status: Some("active".to_string()),
            install_fingerprint: Some(self.install.ensure()),
            last_verified_at: Some(now_ts.clone()),
            last_checked_at: Some(now_ts),
            signature: String::new(),
        };
        payload.signature = self.signer.sign_license(&payload);

        self.store.save(&payload, false)?;
        self.mark_trial_used(hwid);
        debug!(school_uid, "trial license issued");
        Ok(payload)
    }
}
