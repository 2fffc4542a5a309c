//! Storage ports for the Skolara licensing subsystem.
//!
//! Two ports are defined here:
//!
//! - [`KeyValueStore`]: a scoped key-value namespace. `set` reports failure
//!   as `false` instead of an error so callers can degrade to
//!   "no persistence" without branching on error types.
//! - [`HomeDotfiles`]: best-effort redundant copies in home-directory
//!   dotfiles. Absent entirely in sandboxed runtimes (no home directory).
//!
//! Implementations: [`JsonFileStore`] persists each scope as one JSON
//! document under a data directory; [`MemoryStore`] backs tests and
//! sandboxed runtimes.

mod dotfiles;
mod error;
mod json_file;
mod memory;

pub use dotfiles::HomeDotfiles;
pub use error::{StorageError, StorageResult};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// A scoped key-value namespace.
///
/// Transient failures degrade rather than propagate: `get` answers `None`,
/// `set` answers `false`, and `remove` is silent. Callers that must know
/// whether a write landed check the `set` return value.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value, or `None` if absent or unreadable.
    fn get(&self, scope: &str, key: &str) -> Option<String>;

    /// Writes a value. Returns `false` when the write could not be
    /// persisted.
    fn set(&self, scope: &str, key: &str, value: &str) -> bool;

    /// Removes a key. Missing keys and unwritable stores are not errors.
    fn remove(&self, scope: &str, key: &str);
}
