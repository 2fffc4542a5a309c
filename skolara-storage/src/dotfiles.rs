//! Home-directory dotfile port.
//!
//! Dotfiles are the second, independent storage location for the
//! tamper-evident markers (HWID, install fingerprint, trial flag, license
//! ciphertext). Clearing the key-value store alone does not clear these.

use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Best-effort reader/writer of dotfiles under the user's home directory.
///
/// Files are named `.<prefix>_<name>`. Construction fails (returns `None`)
/// when no home directory is resolvable, e.g. in sandboxed runtimes;
/// callers treat the port as simply absent in that case.
#[derive(Debug, Clone)]
pub struct HomeDotfiles {
    home: PathBuf,
    prefix: String,
}

impl HomeDotfiles {
    /// Opens the port, or `None` when no home directory exists.
    #[must_use]
    pub fn open(prefix: &str) -> Option<Self> {
        let home = dirs::home_dir()?;
        Some(Self {
            home,
            prefix: prefix.to_string(),
        })
    }

    /// Opens the port against an explicit directory. Test constructor.
    #[must_use]
    pub fn open_in(dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            home: dir.into(),
            prefix: prefix.to_string(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.home.join(format!(".{}_{name}", self.prefix))
    }

    /// Reads a dotfile, trimmed. `None` if absent or unreadable.
    #[must_use]
    pub fn read(&self, name: &str) -> Option<String> {
        let contents = fs::read_to_string(self.path(name)).ok()?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Writes a dotfile. Returns `false` when the write could not land.
    pub fn write(&self, name: &str, contents: &str) -> bool {
        match fs::write(self.path(name), contents) {
            Ok(()) => true,
            Err(err) => {
                warn!(name, %err, "dotfile write dropped");
                false
            }
        }
    }

    /// Removes a dotfile. Missing files are not errors.
    pub fn remove(&self, name: &str) {
        let _ = fs::remove_file(self.path(name));
    }
}
