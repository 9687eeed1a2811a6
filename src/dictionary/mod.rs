//! Static translation dictionaries.
//!
//! A dictionary maps a translation key to its display string for one locale.
//! Keys of the default locale double as display text: a key missing from the
//! default dictionary is shown verbatim.

mod loader;

use std::collections::HashMap;

use thiserror::Error;

use crate::locale::Locale;

pub use loader::{
    detect_locale_from_path,
    flatten_json,
    load_dictionaries,
    parse_dictionary_text,
};

/// Errors raised while loading translation files.
#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Invalid translation file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to read translation file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse translation file: {0}")]
    Parse(String),

    #[error("Translation file must contain a JSON object at the top level")]
    NotAnObject,
}

/// Immutable-after-load mapping of locale → (key → display string).
#[derive(Debug, Clone, Default)]
pub struct Dictionaries {
    /// Per-locale flattened key maps.
    entries: HashMap<Locale, HashMap<String, String>>,
}

impl Dictionaries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds entries for `locale`, overwriting keys that already exist.
    #[must_use]
    pub fn with_entries<K, V>(mut self, locale: Locale, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.extend(locale, entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Adds entries for `locale`, overwriting keys that already exist.
    pub fn extend(&mut self, locale: Locale, entries: impl IntoIterator<Item = (String, String)>) {
        self.entries.entry(locale).or_default().extend(entries);
    }

    #[must_use]
    pub fn get(&self, locale: &Locale, key: &str) -> Option<&str> {
        self.entries.get(locale)?.get(key).map(String::as_str)
    }
}
