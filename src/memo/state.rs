//! Per-pair cache state.

use futures::future::{
    BoxFuture,
    Shared,
};
use thiserror::Error;

use crate::locale::Locale;
use crate::relay::RelayError;

/// Prefix of every persisted machine translation.
pub const STORAGE_PREFIX: &str = "mt:";

/// Cache key: target locale and source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub locale: Locale,
    pub text: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(locale: &Locale, text: &str) -> Self {
        Self { locale: locale.clone(), text: text.to_string() }
    }

    /// Key under which the translation is persisted (`mt:de:Projects`).
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{STORAGE_PREFIX}{}:{}", self.locale, self.text)
    }
}

/// Why a pair ended up `Failed`. Cloneable so every waiter of a shared fetch gets a copy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("translation request timed out")]
    Timeout,

    #[error("relay responded with status {0}")]
    Status(u16),

    #[error("relay returned no translation")]
    Empty,

    #[error("relay request failed: {0}")]
    Relay(String),

    #[error("no async runtime available to fetch translations")]
    NoRuntime,

    #[error("translation memo was dropped before the fetch completed")]
    Dropped,
}

impl From<&RelayError> for FetchFailure {
    fn from(err: &RelayError) -> Self {
        match err {
            RelayError::Timeout => Self::Timeout,
            RelayError::Status { status, .. } => Self::Status(*status),
            RelayError::EmptyTranslation => Self::Empty,
            other => Self::Relay(other.to_string()),
        }
    }
}

/// Outcome shared by every waiter of one in-flight fetch.
pub(super) type SharedFetch = Shared<BoxFuture<'static, Result<String, FetchFailure>>>;

/// Internal state of a (locale, text) pair. `Uncached` is the absence of an entry.
pub(super) enum PairState {
    /// A relay call is running.
    Fetching(SharedFetch),
    /// Translated text.
    Cached(String),
    /// Terminal failure for this session.
    Failed(FetchFailure),
}

impl std::fmt::Debug for PairState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetching(_) => f.write_str("Fetching"),
            Self::Cached(text) => f.debug_tuple("Cached").field(text).finish(),
            Self::Failed(failure) => f.debug_tuple("Failed").field(failure).finish(),
        }
    }
}

/// Observable state of a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoState {
    Uncached,
    Fetching,
    Cached(String),
    Failed(FetchFailure),
}

impl From<&PairState> for MemoState {
    fn from(state: &PairState) -> Self {
        match state {
            PairState::Fetching(_) => Self::Fetching,
            PairState::Cached(text) => Self::Cached(text.clone()),
            PairState::Failed(failure) => Self::Failed(failure.clone()),
        }
    }
}

/// Broadcast when a pair reaches `Cached` through a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationReady {
    pub locale: Locale,
    pub text: String,
    pub translation: String,
}
