//! Device fingerprinting (HWID).
//!
//! Builds a composite identifier from hardware and platform signals and
//! hashes it. Every probe is best-effort: a failing probe contributes a
//! placeholder segment instead of aborting, because a fingerprint must
//! always be producible. The result is cached in memory and persisted
//! redundantly (key-value store + home dotfile) so clearing one location
//! does not regenerate the ID.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};
use skolara_storage::{HomeDotfiles, KeyValueStore};
use std::env;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Sentinel HWID returned when the host disables enforcement.
pub const BYPASS_HWID: &str = "enforcement-disabled";

const KV_KEY: &str = "hwid";
const DOTFILE: &str = "device";

/// Hardware fingerprint service.
///
/// Storage-agnostic: it takes the thin key-value port rather than the
/// license store, which also breaks the store↔fingerprint dependency
/// cycle.
pub struct DeviceFingerprint {
    kv: Arc<dyn KeyValueStore>,
    files: Option<HomeDotfiles>,
    scope: String,
    bypass: bool,
    cached: Mutex<Option<String>>,
}

impl DeviceFingerprint {
    /// Creates the service. With `bypass` set, no probing or persistence
    /// happens and [`BYPASS_HWID`] is returned from every call.
    #[must_use]
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        files: Option<HomeDotfiles>,
        scope: &str,
        bypass: bool,
    ) -> Self {
        Self {
            kv,
            files,
            scope: scope.to_string(),
            bypass,
            cached: Mutex::new(None),
        }
    }

    /// Returns the stable HWID for this machine.
    ///
    /// Resolution order: in-memory cache, key-value store, dotfile, fresh
    /// generation. Whichever redundant copy is missing gets backfilled.
    pub fn hwid(&self) -> String {
        if self.bypass {
            return BYPASS_HWID.to_string();
        }

        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(id) = cached.as_ref() {
            return id.clone();
        }

        let stored_kv = self.kv.get(&self.scope, KV_KEY);
        let stored_file = self.files.as_ref().and_then(|f| f.read(DOTFILE));

        let id = stored_kv
            .clone()
            .or_else(|| stored_file.clone())
            .unwrap_or_else(|| {
                let generated = generate_hwid();
                debug!(hwid = %generated, "generated device fingerprint");
                generated
            });

        if stored_kv.is_none() {
            self.kv.set(&self.scope, KV_KEY, &id);
        }
        if stored_file.is_none() {
            if let Some(files) = &self.files {
                files.write(DOTFILE, &id);
            }
        }

        *cached = Some(id.clone());
        id
    }
}

/// Hashes the composite probe string into the fingerprint encoding.
fn generate_hwid() -> String {
    let segments = collect_probe_segments();
    let combined = segments.join("|");

    let mut hasher = Sha256::new();
    hasher.update(combined.as_bytes());
    let hash = hasher.finalize();

    BASE64.encode(&hash[..16])
}

/// Collects the probe segments. Each probe degrades to a placeholder.
fn collect_probe_segments() -> Vec<String> {
    vec![
        cpu_signature(),
        format!("os:{}:{}", env::consts::OS, env::consts::ARCH),
        machine_id().unwrap_or_else(|| "machine:unknown".to_string()),
        disk_root_id().unwrap_or_else(|| "disk:unknown".to_string()),
        format!("host:{}", get_hostname()),
    ]
}

fn cpu_signature() -> String {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("cpu:{}:{cores}", env::consts::ARCH)
}

fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Platform-specific machine identifier.
fn machine_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| format!("machine:{}", s.trim()))
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(|uuid| format!("machine:{uuid}"))
            })
    }

    #[cfg(target_os = "windows")]
    {
        // MachineGuid lives in the registry; absent a registry crate this
        // probe degrades to its placeholder.
        None
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        None
    }
}

/// Identifier of the filesystem holding the root.
fn disk_root_id() -> Option<String> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        std::fs::metadata("/")
            .ok()
            .map(|m| format!("disk:{}", m.dev()))
    }

    #[cfg(not(unix))]
    {
        None
    }
}
