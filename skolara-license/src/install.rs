//! Install fingerprint (anti-clone marker).
//!
//! A random identifier generated once per installation and stored
//! redundantly in two independent locations. Unlike the HWID it carries
//! no hardware signal; its only job is to make storage cloning and state
//! resets observable:
//!
//! - the two copies disagree ⇒ storage media was copied partially between
//!   machines (clone);
//! - a license references an older fingerprint than the current one ⇒
//!   local state was wiped to reset counters while the license lingered
//!   (reset).

use crate::payload::InstallIntegrity;
use skolara_storage::{HomeDotfiles, KeyValueStore};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const KV_KEY: &str = "install_fingerprint";
const DOTFILE: &str = "install";

/// Install fingerprint service.
pub struct InstallFingerprint {
    kv: Arc<dyn KeyValueStore>,
    files: Option<HomeDotfiles>,
    scope: String,
}

impl InstallFingerprint {
    /// Creates the service over the two redundant locations.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, files: Option<HomeDotfiles>, scope: &str) -> Self {
        Self {
            kv,
            files,
            scope: scope.to_string(),
        }
    }

    /// Returns the install fingerprint, generating and double-writing it
    /// on first run, and backfilling whichever copy is missing.
    pub fn ensure(&self) -> String {
        let stored_kv = self.kv.get(&self.scope, KV_KEY);
        let stored_file = self.files.as_ref().and_then(|f| f.read(DOTFILE));

        let id = match (&stored_kv, &stored_file) {
            (Some(id), _) => id.clone(),
            (None, Some(id)) => id.clone(),
            (None, None) => {
                let id = Uuid::new_v4().to_string();
                debug!(install_fingerprint = %id, "generated install fingerprint");
                id
            }
        };

        if stored_kv.is_none() {
            self.kv.set(&self.scope, KV_KEY, &id);
        }
        if stored_file.is_none() {
            if let Some(files) = &self.files {
                files.write(DOTFILE, &id);
            }
        }
        id
    }

    /// Checks installation integrity against the redundant copies and,
    /// optionally, the fingerprint a stored license was issued under.
    ///
    /// Divergent copies win over everything: a clone verdict is returned
    /// before any healing. With agreeing (or single) copies, a license
    /// bound to a different fingerprint signals a reset. Otherwise the
    /// check self-heals by backfilling the missing copy.
    pub fn validate_integrity(&self, license_bound: Option<&str>) -> InstallIntegrity {
        let stored_kv = self.kv.get(&self.scope, KV_KEY);
        let stored_file = self.files.as_ref().and_then(|f| f.read(DOTFILE));

        if let (Some(a), Some(b)) = (&stored_kv, &stored_file) {
            if a != b {
                warn!("install fingerprint copies diverge");
                return InstallIntegrity::CloneDetected;
            }
        }

        let current = stored_kv.clone().or_else(|| stored_file.clone());
        if let (Some(current), Some(bound)) = (&current, license_bound) {
            if bound != current {
                warn!("license references a stale install fingerprint");
                return InstallIntegrity::ResetDetected;
            }
        }

        // Self-heal: backfill the missing copy.
        if let Some(id) = &current {
            if stored_kv.is_none() {
                self.kv.set(&self.scope, KV_KEY, id);
            }
            if stored_file.is_none() {
                if let Some(files) = &self.files {
                    files.write(DOTFILE, id);
                }
            }
        }

        InstallIntegrity::Ok
    }
}
