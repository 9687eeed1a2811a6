//! Durable client-side key-value storage.
//!
//! The translation layer persists two kinds of values: the chosen locale and
//! machine translations. Callers treat every storage failure as non-fatal.

mod file;
mod memory;

use std::fmt;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Failure of a [`KeyValueStore`] operation.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Storage lock was poisoned")]
    Poisoned,
}

/// String key-value storage shared by every consumer in the process.
pub trait KeyValueStore: fmt::Debug + Send + Sync {
    /// # Errors
    /// Returns [`StorageError`] if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, overwriting any prior value.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the removal cannot be persisted.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Removes every key matching `predicate` in one change and returns how
    /// many were removed.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the removal cannot be persisted.
    fn remove_matching(&self, predicate: &dyn Fn(&str) -> bool) -> Result<usize, StorageError>;

    /// All keys currently stored.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the backing store cannot be read.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}
