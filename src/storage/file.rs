//! JSON-file backed store.
//!
//! The whole map is kept in memory and the file is rewritten on every change
//! (write to a sibling temp file, then rename).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use super::{
    KeyValueStore,
    StorageError,
};

/// Directory name under the platform data dir.
const APP_DIR: &str = "folio-i18n";
/// File name of the default store.
const STORE_FILE: &str = "store.json";

/// Store persisted as one JSON object of strings.
#[derive(Debug)]
pub struct FileStore {
    /// Location of the JSON file.
    path: PathBuf,
    /// Current contents, mirrored to `path`.
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    /// - The file exists but cannot be read
    /// - The file is not a JSON object of strings
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Store file not found, starting empty: {:?}", path);
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, values: Mutex::new(values) })
    }

    /// `<data dir>/folio-i18n/store.json`, if the platform has a data dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(APP_DIR).join(STORE_FILE))
    }

    /// Writes `values` to disk.
    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(values)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        if values.get(key).is_some_and(|existing| existing == value) {
            return Ok(());
        }
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        if values.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&values)
    }

    fn remove_matching(&self, predicate: &dyn Fn(&str) -> bool) -> Result<usize, StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        let before = values.len();
        values.retain(|key, _| !predicate(key.as_str()));
        let removed = before - values.len();
        if removed == 0 {
            return Ok(0);
        }
        self.flush(&values)?;
        Ok(removed)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.keys().cloned().collect())
    }
}
