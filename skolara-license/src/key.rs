//! License key issuance and the issued-key registry.
//!
//! Keys are the admin-side, distributable credential: human-enterable
//! text, signed, single-use. They are a separate lifecycle from the bound
//! licenses they redeem into; redemption itself lives in the activation
//! service.

use crate::clock::Clock;
use crate::error::{LicenseError, LicenseResult};
use crate::payload::{ceil_days, format_ts, parse_ts, KeyKind, KeyStatus, LicenseKeyPayload};
use crate::signer::PayloadSigner;
use rand::Rng;
use skolara_storage::KeyValueStore;
use std::sync::Arc;
use tracing::debug;

/// Key-text alphabet. Excludes visually ambiguous glyphs (I, L, O, 0, 1).
pub const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Duration assigned when the issuer names neither a duration nor an
/// expiry.
pub const DEFAULT_KEY_DURATION_DAYS: i64 = 365;

const BLOCKS: usize = 4;
const BLOCK_LEN: usize = 4;

/// Issuance request for a new key.
#[derive(Debug, Clone)]
pub struct KeyRequest {
    /// Display name of the school.
    pub school_name: String,
    /// Optional short school code.
    pub school_code: Option<String>,
    /// Optional school UID restriction.
    pub school_uid: Option<String>,
    /// What the key redeems into.
    pub kind: KeyKind,
    /// License duration in days; ignored when `expires_at` is given.
    pub duration_days: Option<i64>,
    /// Explicit license expiry; duration is derived from it.
    pub expires_at: Option<String>,
    /// Device budget, defaults to 1.
    pub max_devices: Option<u32>,
    /// Issuing admin identity.
    pub issued_by: String,
}

/// Generates signed license keys.
pub struct LicenseKeyFactory {
    signer: Arc<PayloadSigner>,
    clock: Arc<dyn Clock>,
}

impl LicenseKeyFactory {
    /// Creates the factory.
    #[must_use]
    pub fn new(signer: Arc<PayloadSigner>, clock: Arc<dyn Clock>) -> Self {
        Self { signer, clock }
    }

    /// Issues a new signed key.
    ///
    /// # Errors
    ///
    /// `MalformedDate` when `expires_at` does not parse; `KeyExpired`
    /// when it is already in the past.
    pub fn generate(&self, request: &KeyRequest) -> LicenseResult<LicenseKeyPayload> {
        let now = self.clock.now();

        let duration_days = match &request.expires_at {
            Some(raw) => {
                let expiry = parse_ts(raw)
                    .ok_or_else(|| LicenseError::MalformedDate(raw.clone()))?;
                if expiry <= now {
                    return Err(LicenseError::KeyExpired(raw.clone()));
                }
                ceil_days(now, expiry)
            }
            None => request.duration_days.unwrap_or(DEFAULT_KEY_DURATION_DAYS),
        };

        let mut key = LicenseKeyPayload {
            license_key: generate_key_text(),
            school_name: request.school_name.clone(),
            school_code: request.school_code.clone(),
            school_uid: request.school_uid.clone(),
            license_type: request.kind,
            duration_days,
            max_devices: request.max_devices.unwrap_or(1),
            issued_at: format_ts(now),
            expires_at: request.expires_at.clone(),
            issued_by: request.issued_by.clone(),
            activated: false,
            activated_at: None,
            bound_hwid: None,
            revoked: false,
            signature: String::new(),
        };
        key.signature = self.signer.sign_key(&key);
        debug!(license_key = %key.license_key, "issued license key");
        Ok(key)
    }
}

/// Generates key text: four dash-separated four-character blocks.
#[must_use]
pub fn generate_key_text() -> String {
    let mut rng = rand::thread_rng();
    let mut blocks = Vec::with_capacity(BLOCKS);
    for _ in 0..BLOCKS {
        let block: String = (0..BLOCK_LEN)
            .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
            .collect();
        blocks.push(block);
    }
    blocks.join("-")
}

/// An issued key with its derived status.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    /// The stored key payload.
    pub payload: LicenseKeyPayload,
    /// Status derived at listing time.
    pub status: KeyStatus,
}

/// Admin-side registry of issued keys.
///
/// The key-value port has no enumeration, so the registry keeps its own
/// index entry alongside the key documents.
pub struct LicenseKeyStore {
    kv: Arc<dyn KeyValueStore>,
    scope: String,
    clock: Arc<dyn Clock>,
}

const INDEX_KEY: &str = "_index";

impl LicenseKeyStore {
    /// Creates the registry over the given scope.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, scope: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            kv,
            scope: scope.to_string(),
            clock,
        }
    }

    fn index(&self) -> Vec<String> {
        self.kv
            .get(&self.scope, INDEX_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn write_index(&self, index: &[String]) -> LicenseResult<()> {
        let raw = serde_json::to_string(index)?;
        if !self.kv.set(&self.scope, INDEX_KEY, &raw) {
            return Err(LicenseError::Storage("key index write failed".to_string()));
        }
        Ok(())
    }

    /// Persists a key (new or updated).
    ///
    /// # Errors
    ///
    /// `Storage` when the write does not land.
    pub fn save(&self, key: &LicenseKeyPayload) -> LicenseResult<()> {
        let raw = serde_json::to_string(key)?;
        if !self.kv.set(&self.scope, &key.license_key, &raw) {
            return Err(LicenseError::Storage("key write failed".to_string()));
        }
        let mut index = self.index();
        if !index.contains(&key.license_key) {
            index.push(key.license_key.clone());
            self.write_index(&index)?;
        }
        Ok(())
    }

    /// Looks up a key by its text.
    #[must_use]
    pub fn get(&self, key_text: &str) -> Option<LicenseKeyPayload> {
        let raw = self.kv.get(&self.scope, key_text)?;
        serde_json::from_str(&raw).ok()
    }

    /// Flags a key as revoked.
    ///
    /// # Errors
    ///
    /// `Storage` when the key does not exist or the write fails.
    pub fn revoke(&self, key_text: &str) -> LicenseResult<LicenseKeyPayload> {
        let mut key = self
            .get(key_text)
            .ok_or_else(|| LicenseError::Storage(format!("unknown key {key_text}")))?;
        key.revoked = true;
        self.save(&key)?;
        Ok(key)
    }

    /// Lists every issued key with its status derived at the current
    /// instant: revoked > activated > expired > unused.
    #[must_use]
    pub fn list(&self) -> Vec<KeyRecord> {
        let now = self.clock.now();
        self.index()
            .iter()
            .filter_map(|key_text| self.get(key_text))
            .map(|payload| KeyRecord {
                status: payload.status_at(now),
                payload,
            })
            .collect()
    }
}
