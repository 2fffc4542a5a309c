//! Composition root for the licensing subsystem.
//!
//! The services form a small graph (device fingerprint feeding the store,
//! store feeding the validator, …) with a known construction order; this
//! module wires it once so hosts and tests build the whole subsystem from
//! the two ports (key-value store, crypto capability) plus a clock.

use crate::activation::{KeyActivationContext, OfflineActivationService};
use crate::clock::{Clock, SystemClock};
use crate::codec::LicenseCodec;
use crate::device::DeviceFingerprint;
use crate::error::{LicenseError, LicenseResult};
use crate::install::InstallFingerprint;
use crate::key::{LicenseKeyFactory, LicenseKeyStore};
use crate::payload::{InstallIntegrity, LicenseKeyPayload, LicensePayload, ValidationOutcome};
use crate::signer::PayloadSigner;
use crate::store::LicenseStore;
use crate::trial::TrialManager;
use crate::validator::{EnforcementDecision, EnforcementOptions, LicenseValidator};
use skolara_crypto::{CryptoCapability, StrongCrypto};
use skolara_storage::{HomeDotfiles, JsonFileStore, KeyValueStore};
use std::sync::Arc;

/// Construction-time configuration for the subsystem.
#[derive(Debug, Clone)]
pub struct LicensingConfig {
    /// Key-value scope for licensing state.
    pub scope: String,
    /// Key-value scope for the issued-key registry.
    pub keys_scope: String,
    /// Prefix for home-directory dotfiles.
    pub dotfile_prefix: String,
    /// Host-supplied no-enforcement flag; short-circuits the subsystem
    /// to always-valid with no persistence side effects.
    pub enforcement_disabled: bool,
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            scope: "licensing".to_string(),
            keys_scope: "license_keys".to_string(),
            dotfile_prefix: "skolara".to_string(),
            enforcement_disabled: false,
        }
    }
}

/// The wired licensing subsystem.
pub struct Licensing {
    device: Arc<DeviceFingerprint>,
    install: Arc<InstallFingerprint>,
    store: Arc<LicenseStore>,
    trial: Arc<TrialManager>,
    validator: LicenseValidator,
    key_factory: LicenseKeyFactory,
    key_store: LicenseKeyStore,
    activation: OfflineActivationService,
}

impl Licensing {
    /// Wires the subsystem from explicit ports. Tests use this with a
    /// memory store, a fixed clock, and a temp-dir dotfile port.
    #[must_use]
    pub fn new(
        config: LicensingConfig,
        kv: Arc<dyn KeyValueStore>,
        files: Option<HomeDotfiles>,
        crypto: Arc<dyn CryptoCapability>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let device = Arc::new(DeviceFingerprint::new(
            Arc::clone(&kv),
            files.clone(),
            &config.scope,
            config.enforcement_disabled,
        ));
        let install = Arc::new(InstallFingerprint::new(
            Arc::clone(&kv),
            files.clone(),
            &config.scope,
        ));
        let signer = Arc::new(PayloadSigner::new(Arc::clone(&crypto)));
        let store = Arc::new(LicenseStore::new(
            Arc::clone(&kv),
            files.clone(),
            &config.scope,
            LicenseCodec::new(Arc::clone(&crypto)),
            Arc::clone(&device),
        ));
        let trial = Arc::new(TrialManager::new(
            Arc::clone(&kv),
            files,
            &config.scope,
            Arc::clone(&signer),
            Arc::clone(&store),
            Arc::clone(&install),
            Arc::clone(&clock),
        ));
        let validator = LicenseValidator::new(
            Arc::clone(&device),
            Arc::clone(&store),
            Arc::clone(&trial),
            Arc::clone(&signer),
            Arc::clone(&clock),
            config.enforcement_disabled,
        );
        let key_factory = LicenseKeyFactory::new(Arc::clone(&signer), Arc::clone(&clock));
        let key_store = LicenseKeyStore::new(Arc::clone(&kv), &config.keys_scope, Arc::clone(&clock));
        let activation = OfflineActivationService::new(
            signer,
            Arc::clone(&store),
            Arc::clone(&device),
            Arc::clone(&install),
            clock,
        );

        Self {
            device,
            install,
            store,
            trial,
            validator,
            key_factory,
            key_store,
            activation,
        }
    }

    /// Opens the subsystem against the host's real environment: a JSON
    /// file store under the local data directory, home dotfiles, strong
    /// crypto, and the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error when no data directory is resolvable or the
    /// store cannot be created.
    pub fn open(config: LicensingConfig) -> LicenseResult<Self> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| LicenseError::Storage("no local data directory".to_string()))?
            .join("skolara");
        let kv: Arc<dyn KeyValueStore> = Arc::new(
            JsonFileStore::open(data_dir)
                .map_err(|e| LicenseError::Storage(e.to_string()))?,
        );
        let files = HomeDotfiles::open(&config.dotfile_prefix);
        Ok(Self::new(
            config,
            kv,
            files,
            Arc::new(StrongCrypto::new()),
            Arc::new(SystemClock),
        ))
    }

    /// The stable HWID for this machine.
    pub fn hwid(&self) -> String {
        self.device.hwid()
    }

    /// The install fingerprint, generating it on first run.
    pub fn ensure_install_fingerprint(&self) -> String {
        self.install.ensure()
    }

    /// Checks install integrity against the stored license's recorded
    /// fingerprint.
    pub fn install_integrity(&self) -> InstallIntegrity {
        let bound = self.store.load().and_then(|p| p.install_fingerprint);
        self.install.validate_integrity(bound.as_deref())
    }

    /// Runs a validation pass.
    pub fn validate(&self, expected_school_uid: Option<&str>) -> ValidationOutcome {
        self.validator.validate(expected_school_uid)
    }

    /// Runs validation and maps it to an enforcement decision.
    pub fn enforce(&self, options: &EnforcementOptions) -> EnforcementDecision {
        self.validator.enforce(options)
    }

    /// Issues the device's one trial license.
    ///
    /// # Errors
    ///
    /// See [`TrialManager::create_trial_license`].
    pub fn create_trial_license(&self, school_uid: &str) -> LicenseResult<LicensePayload> {
        self.trial.create_trial_license(school_uid, &self.device.hwid())
    }

    /// Redeems a license key on this device.
    ///
    /// # Errors
    ///
    /// See [`OfflineActivationService::activate_license_key`].
    pub fn activate_license_key(
        &self,
        key: &LicenseKeyPayload,
        ctx: &KeyActivationContext,
    ) -> LicenseResult<(LicensePayload, LicenseKeyPayload)> {
        self.activation.activate_license_key(key, ctx)
    }

    /// Activates a pre-issued license payload from pasted text.
    ///
    /// # Errors
    ///
    /// See [`OfflineActivationService::activate_offline_license`].
    pub fn activate_offline_license(
        &self,
        raw_text: &str,
        expected_school_uid: &str,
    ) -> LicenseResult<LicensePayload> {
        self.activation
            .activate_offline_license(raw_text, expected_school_uid)
    }

    /// The license store.
    #[must_use]
    pub fn store(&self) -> &LicenseStore {
        &self.store
    }

    /// The trial manager.
    #[must_use]
    pub fn trial(&self) -> &TrialManager {
        &self.trial
    }

    /// The validator.
    #[must_use]
    pub fn validator(&self) -> &LicenseValidator {
        &self.validator
    }

    /// The admin-side key factory.
    #[must_use]
    pub fn key_factory(&self) -> &LicenseKeyFactory {
        &self.key_factory
    }

    /// The admin-side issued-key registry.
    #[must_use]
    pub fn key_store(&self) -> &LicenseKeyStore {
        &self.key_store
    }
}
