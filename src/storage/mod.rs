//! Key-value storage backends.
//!
//! Overrides, the logged-in user and avatars all live in a string-keyed,
//! string-valued storage. Two scopes exist: a session scope that dies with
//! the process ([`MemoryStorage`]) and a persistent scope that survives
//! restarts ([`FileStorage`]).

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// A string-keyed, string-valued storage area.
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// On failure (including [`StoreError::QuotaExceeded`](crate::StoreError))
    /// the previous value is left in place.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Returns whether it was present.
    fn remove(&self, key: &str) -> Result<bool>;

    /// All keys currently stored, in ascending order.
    fn keys(&self) -> Result<Vec<String>>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Bytes an entry counts against a quota.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}
