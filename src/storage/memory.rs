//! In-process store, used when no durable location is available and in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{
    KeyValueStore,
    StorageError,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Stored values.
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.remove(key);
        Ok(())
    }

    fn remove_matching(&self, predicate: &dyn Fn(&str) -> bool) -> Result<usize, StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        let before = values.len();
        values.retain(|key, _| !predicate(key.as_str()));
        Ok(before - values.len())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.keys().cloned().collect())
    }
}
