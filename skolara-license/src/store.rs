//! License persistence facade.
//!
//! One logical license per installation, stored encrypted in the
//! key-value store with a redundant dotfile copy. First write wins:
//! overwriting requires `allow_update`, so an installed license cannot be
//! silently replaced by a second issuance path.

use crate::codec::LicenseCodec;
use crate::device::DeviceFingerprint;
use crate::error::{LicenseError, LicenseResult};
use crate::payload::LicensePayload;
use skolara_storage::{HomeDotfiles, KeyValueStore};
use std::sync::Arc;
use tracing::warn;

const KV_KEY: &str = "license";
const DOTFILE: &str = "license";

/// Persists the installation's license.
pub struct LicenseStore {
    kv: Arc<dyn KeyValueStore>,
    files: Option<HomeDotfiles>,
    scope: String,
    codec: LicenseCodec,
    device: Arc<DeviceFingerprint>,
}

impl LicenseStore {
    /// Creates the store.
    #[must_use]
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        files: Option<HomeDotfiles>,
        scope: &str,
        codec: LicenseCodec,
        device: Arc<DeviceFingerprint>,
    ) -> Self {
        Self {
            kv,
            files,
            scope: scope.to_string(),
            codec,
            device,
        }
    }

    /// Raw stored ciphertext, reconciling the redundant copies (key-value
    /// store wins; the missing copy is backfilled).
    #[must_use]
    pub fn load_raw(&self) -> Option<String> {
        let stored_kv = self.kv.get(&self.scope, KV_KEY);
        let stored_file = self.files.as_ref().and_then(|f| f.read(DOTFILE));

        match (stored_kv, stored_file) {
            (Some(blob), None) => {
                if let Some(files) = &self.files {
                    files.write(DOTFILE, &blob);
                }
                Some(blob)
            }
            (None, Some(blob)) => {
                self.kv.set(&self.scope, KV_KEY, &blob);
                Some(blob)
            }
            (Some(blob), Some(_)) => Some(blob),
            (None, None) => None,
        }
    }

    /// True when license bytes exist at all, decryptable or not. This is
    /// what lets callers distinguish "corrupt" from "absent".
    #[must_use]
    pub fn exists(&self) -> bool {
        self.load_raw().is_some()
    }

    /// Loads and decrypts the license. `None` when absent *or* when the
    /// bytes are undecryptable; pair with [`Self::exists`] to tell the
    /// two apart.
    #[must_use]
    pub fn load(&self) -> Option<LicensePayload> {
        let raw = self.load_raw()?;
        self.codec.decrypt(&raw, &self.device.hwid())
    }

    /// Encrypts and persists a payload to both locations.
    ///
    /// # Errors
    ///
    /// `LicenseAlreadyExists` when a license is present and `allow_update`
    /// is unset; `Storage` when no location accepted the write.
    pub fn save(&self, payload: &LicensePayload, allow_update: bool) -> LicenseResult<()> {
        if !allow_update && self.exists() {
            return Err(LicenseError::LicenseAlreadyExists);
        }

        let blob = self.codec.encrypt(payload, &self.device.hwid())?;
        let wrote_kv = self.kv.set(&self.scope, KV_KEY, &blob);
        let wrote_file = self
            .files
            .as_ref()
            .map(|f| f.write(DOTFILE, &blob))
            .unwrap_or(false);

        if !wrote_kv && !wrote_file {
            warn!("license write landed nowhere");
            return Err(LicenseError::Storage(
                "no storage location accepted the license".to_string(),
            ));
        }
        Ok(())
    }
}
