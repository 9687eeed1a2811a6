//! Test helpers shared by several test modules.
#![cfg(test)]
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::time::Duration;

use async_trait::async_trait;

use crate::dictionary::Dictionaries;
use crate::locale::{
    Locale,
    SupportedLocales,
};
use crate::relay::{
    RelayError,
    TranslationRelay,
};
use crate::storage::{
    KeyValueStore,
    StorageError,
};

pub(crate) fn locale(tag: &str) -> Locale {
    Locale::parse(tag).unwrap()
}

/// `en` (default) and `de`, as on the site.
pub(crate) fn en_de() -> SupportedLocales {
    SupportedLocales::new(locale("en"), [locale("de")]).unwrap()
}

/// `nav.resume` in both locales; nothing else.
pub(crate) fn sample_dictionaries() -> Dictionaries {
    Dictionaries::new()
        .with_entries(locale("en"), [("nav.resume", "Resume")])
        .with_entries(locale("de"), [("nav.resume", "Lebenslauf")])
}

/// Relay answering from a fixed table; unknown texts fail with status 500.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRelay {
    translations: HashMap<String, String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedRelay {
    pub(crate) fn new<'a>(translations: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            translations: translations
                .into_iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationRelay for ScriptedRelay {
    async fn translate(&self, text: &str, _target: &Locale) -> Result<String, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.translations
            .get(text)
            .cloned()
            .ok_or_else(|| RelayError::Status { status: 500, body: String::new() })
    }
}

/// Store whose every operation fails.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FailingStore;

impl FailingStore {
    fn error() -> StorageError {
        StorageError::Io(std::io::Error::other("disk on fire"))
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(Self::error())
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(Self::error())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(Self::error())
    }

    fn remove_matching(&self, _predicate: &dyn Fn(&str) -> bool) -> Result<usize, StorageError> {
        Err(Self::error())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Err(Self::error())
    }
}
