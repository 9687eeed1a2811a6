//! Machine-translation memoization.
//!
//! For (locale, text) pairs the static dictionary does not cover, a
//! [`TranslationMemo`] fetches a translation once per pair, keeps it in memory
//! and in durable storage, and falls back to the source text on any failure.
//!
//! # State machine
//!
//! `Uncached → Fetching → Cached | Failed`. Both end states are terminal for
//! the session; there is no retry and no expiry. Entries only go away through
//! [`TranslationMemo::forget`] or [`TranslationMemo::clear`].
//!
//! Concurrent first requests share one in-flight fetch, so every pair costs at
//! most one relay request per session.

mod state;

use std::collections::HashMap;
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
    Weak,
};
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

pub use state::{
    CacheKey,
    FetchFailure,
    MemoState,
    STORAGE_PREFIX,
    TranslationReady,
};
use state::{
    PairState,
    SharedFetch,
};

use crate::locale::Locale;
use crate::relay::TranslationRelay;
use crate::storage::KeyValueStore;

/// Upper bound on a single relay call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// Buffered [`TranslationReady`] events per subscriber.
const EVENT_CAPACITY: usize = 64;

/// What a lookup found, or started.
enum Begin {
    /// A translation is available.
    Cached(String),
    /// The pair failed earlier in this session.
    Failed(FetchFailure),
    /// A fetch is running.
    InFlight(SharedFetch),
}

/// Counts of entries removed by [`TranslationMemo::clear`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearStats {
    /// Cached or failed pairs dropped from memory.
    pub in_memory: usize,
    /// Machine translations removed from storage.
    pub persisted: usize,
}

/// State shared by every clone of a [`TranslationMemo`].
struct MemoInner {
    /// Source of machine translations.
    relay: Arc<dyn TranslationRelay>,
    /// Durable copy of cached translations.
    store: Arc<dyn KeyValueStore>,
    /// Upper bound on one relay call.
    timeout: Duration,
    /// Per-pair state of this session.
    entries: Mutex<HashMap<CacheKey, PairState>>,
    /// Publishes [`TranslationReady`].
    events: broadcast::Sender<TranslationReady>,
    /// Relay requests issued so far.
    requests: AtomicUsize,
}

impl MemoInner {
    /// Locks the entry map. A poisoned map is still consistent: every
    /// mutation is a single insert or remove.
    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, PairState>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the outcome of a fetch.
    fn complete(&self, key: &CacheKey, outcome: &Result<String, FetchFailure>) {
        match outcome {
            Ok(translation) => {
                self.entries().insert(key.clone(), PairState::Cached(translation.clone()));
                tracing::debug!(locale = %key.locale, text = %key.text, "Cached machine translation");

                if let Err(e) = self.store.set(&key.storage_key(), translation) {
                    tracing::warn!("Failed to persist translation for {:?}: {}", key.text, e);
                }
                // no subscribers is fine
                let _ = self.events.send(TranslationReady {
                    locale: key.locale.clone(),
                    text: key.text.clone(),
                    translation: translation.clone(),
                });
            }
            Err(failure) => {
                self.entries().insert(key.clone(), PairState::Failed(failure.clone()));
                tracing::warn!(
                    locale = %key.locale,
                    "Machine translation failed, keeping source text: {}",
                    failure
                );
            }
        }
    }
}

/// Cloneable handle to a shared translation cache.
#[derive(Clone)]
pub struct TranslationMemo {
    /// Shared state.
    inner: Arc<MemoInner>,
}

impl std::fmt::Debug for TranslationMemo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationMemo")
            .field("relay", &self.inner.relay)
            .field("timeout", &self.inner.timeout)
            .field("entries", &self.inner.entries().len())
            .finish_non_exhaustive()
    }
}

impl TranslationMemo {
    #[must_use]
    pub fn new(relay: Arc<dyn TranslationRelay>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_timeout(relay, store, DEFAULT_FETCH_TIMEOUT)
    }

    #[must_use]
    pub fn with_timeout(
        relay: Arc<dyn TranslationRelay>,
        store: Arc<dyn KeyValueStore>,
        timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(MemoInner {
                relay,
                store,
                timeout,
                entries: Mutex::new(HashMap::new()),
                events,
                requests: AtomicUsize::new(0),
            }),
        }
    }

    /// Text to show for `text` in `locale` right now.
    ///
    /// Returns the cached translation, or `text` itself while the pair is
    /// uncached, fetching or failed. An uncached pair starts its fetch in the
    /// background. Never blocks.
    ///
    /// Callers must not use this for the default locale.
    #[must_use]
    pub fn get_display_text(&self, locale: &Locale, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        match self.begin(&CacheKey::new(locale, text)) {
            Some(Begin::Cached(translation)) => translation,
            Some(Begin::Failed(_) | Begin::InFlight(_)) | None => text.to_string(),
        }
    }

    /// Waits for the translation of `text` into `locale`.
    ///
    /// Awaits the pair's in-flight fetch if there is one, or starts it. `Err`
    /// means the caller should keep showing `text`.
    pub async fn resolve(&self, locale: &Locale, text: &str) -> Result<String, FetchFailure> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        match self.begin(&CacheKey::new(locale, text)) {
            Some(Begin::Cached(translation)) => Ok(translation),
            Some(Begin::Failed(failure)) => Err(failure),
            Some(Begin::InFlight(fetch)) => fetch.await,
            None => Err(FetchFailure::NoRuntime),
        }
    }

    #[must_use]
    pub fn state(&self, locale: &Locale, text: &str) -> MemoState {
        self.inner
            .entries()
            .get(&CacheKey::new(locale, text))
            .map_or(MemoState::Uncached, MemoState::from)
    }

    /// Receiver of [`TranslationReady`] events, one per completed fetch.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TranslationReady> {
        self.inner.events.subscribe()
    }

    /// Relay requests issued since construction.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::Relaxed)
    }

    /// Waits until every fetch started so far has finished.
    ///
    /// Returns the number of fetches awaited. Outcomes are recorded as usual.
    pub async fn settle(&self) -> usize {
        let pending: Vec<SharedFetch> = self
            .inner
            .entries()
            .values()
            .filter_map(|state| match state {
                PairState::Fetching(fetch) => Some(fetch.clone()),
                PairState::Cached(_) | PairState::Failed(_) => None,
            })
            .collect();

        let count = pending.len();
        futures::future::join_all(pending).await;
        count
    }

    /// Drops the cached or failed state of one pair, in memory and in storage.
    ///
    /// An in-flight fetch is left alone. Returns whether an in-memory entry was removed.
    pub fn forget(&self, locale: &Locale, text: &str) -> bool {
        let key = CacheKey::new(locale, text);
        let removed = {
            let mut entries = self.inner.entries();
            if matches!(entries.get(&key), Some(PairState::Fetching(_))) {
                return false;
            }
            entries.remove(&key).is_some()
        };

        if let Err(e) = self.inner.store.remove(&key.storage_key()) {
            tracing::warn!("Failed to remove persisted translation for {:?}: {}", key.text, e);
        }
        removed
    }

    /// Drops every cached or failed pair and every persisted machine translation.
    /// In-flight fetches are left alone.
    pub fn clear(&self) -> ClearStats {
        let in_memory = {
            let mut entries = self.inner.entries();
            let before = entries.len();
            entries.retain(|_, state| matches!(state, PairState::Fetching(_)));
            before - entries.len()
        };

        let persisted = self
            .inner
            .store
            .remove_matching(&|key: &str| key.starts_with(STORAGE_PREFIX))
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to remove persisted translations: {}", e);
                0
            });

        tracing::debug!(in_memory, persisted, "Cleared translation cache");
        ClearStats { in_memory, persisted }
    }

    /// Looks the pair up in memory, then storage, and otherwise starts a fetch.
    ///
    /// Returns `None` when a fetch is needed but no runtime is available; the
    /// pair then stays uncached.
    fn begin(&self, key: &CacheKey) -> Option<Begin> {
        let mut entries = self.inner.entries();

        if let Some(state) = entries.get(key) {
            return Some(match state {
                PairState::Cached(translation) => Begin::Cached(translation.clone()),
                PairState::Failed(failure) => Begin::Failed(failure.clone()),
                PairState::Fetching(fetch) => Begin::InFlight(fetch.clone()),
            });
        }

        match self.inner.store.get(&key.storage_key()) {
            Ok(Some(stored)) if !stored.trim().is_empty() => {
                tracing::trace!(locale = %key.locale, text = %key.text, "Restored translation from storage");
                entries.insert(key.clone(), PairState::Cached(stored.clone()));
                return Some(Begin::Cached(stored));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to read persisted translation: {}", e),
        }

        let Ok(handle) = Handle::try_current() else {
            tracing::debug!("No async runtime, skipping machine translation");
            return None;
        };

        let fetch = run_fetch(Arc::downgrade(&self.inner), key.clone()).boxed().shared();
        entries.insert(key.clone(), PairState::Fetching(fetch.clone()));
        drop(entries);

        // keeps the fetch running when nobody awaits it
        drop(handle.spawn(fetch.clone()));
        Some(Begin::InFlight(fetch))
    }
}

/// Performs the relay call for `key` and records the outcome.
async fn run_fetch(inner: Weak<MemoInner>, key: CacheKey) -> Result<String, FetchFailure> {
    let (relay, timeout) = {
        let Some(memo) = inner.upgrade() else {
            return Err(FetchFailure::Dropped);
        };
        memo.requests.fetch_add(1, Ordering::Relaxed);
        (Arc::clone(&memo.relay), memo.timeout)
    };

    let outcome = match tokio::time::timeout(timeout, relay.translate(&key.text, &key.locale)).await
    {
        Ok(Ok(translation)) => {
            let translation = translation.trim();
            if translation.is_empty() {
                Err(FetchFailure::Empty)
            } else {
                Ok(translation.to_string())
            }
        }
        Ok(Err(e)) => Err(FetchFailure::from(&e)),
        Err(_) => Err(FetchFailure::Timeout),
    };

    if let Some(memo) = inner.upgrade() {
        memo.complete(&key, &outcome);
    }
    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_utils::{
        FailingStore,
        ScriptedRelay,
        locale,
    };

    fn memo_with(relay: &Arc<ScriptedRelay>, store: &Arc<MemoryStore>) -> TranslationMemo {
        TranslationMemo::new(relay.clone(), store.clone())
    }

    #[fixture]
    fn relay() -> Arc<ScriptedRelay> {
        Arc::new(ScriptedRelay::new([("Projects", "Projekte"), ("Publications", "Publikationen")]))
    }

    #[fixture]
    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    #[rstest]
    #[tokio::test]
    async fn first_render_shows_source_then_translation(
        relay: Arc<ScriptedRelay>,
        store: Arc<MemoryStore>,
    ) {
        let memo = memo_with(&relay, &store);
        let de = locale("de");

        assert_eq!(memo.get_display_text(&de, "Projects"), "Projects");
        assert_eq!(memo.state(&de, "Projects"), MemoState::Fetching);

        assert_eq!(memo.resolve(&de, "Projects").await, Ok("Projekte".to_string()));
        assert_eq!(memo.get_display_text(&de, "Projects"), "Projekte");
        assert_eq!(memo.get_display_text(&de, "Projects"), "Projekte");
        assert_eq!(memo.state(&de, "Projects"), MemoState::Cached("Projekte".to_string()));

        assert_eq!(relay.calls(), 1);
        assert_eq!(memo.request_count(), 1);
        assert_eq!(store.get("mt:de:Projects").unwrap().as_deref(), Some("Projekte"));
    }

    #[rstest]
    #[tokio::test]
    async fn concurrent_requests_share_one_fetch(store: Arc<MemoryStore>) {
        let relay = Arc::new(
            ScriptedRelay::new([("Projects", "Projekte")]).with_delay(Duration::from_millis(50)),
        );
        let memo = memo_with(&relay, &store);
        let de = locale("de");

        for _ in 0..5 {
            assert_eq!(memo.get_display_text(&de, "Projects"), "Projects");
        }
        let waiters: Vec<_> = (0..5)
            .map(|_| {
                let memo = memo.clone();
                let de = de.clone();
                tokio::spawn(async move { memo.resolve(&de, "Projects").await })
            })
            .collect();

        for waiter in futures::future::join_all(waiters).await {
            assert_eq!(waiter.unwrap(), Ok("Projekte".to_string()));
        }
        assert_eq!(relay.calls(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn failure_degrades_to_source_without_retry(
        relay: Arc<ScriptedRelay>,
        store: Arc<MemoryStore>,
    ) {
        let memo = memo_with(&relay, &store);
        let de = locale("de");

        let failure = tokio_test::assert_err!(memo.resolve(&de, "Imprint").await);

        assert_eq!(failure, FetchFailure::Status(500));
        for _ in 0..10 {
            assert_eq!(memo.get_display_text(&de, "Imprint"), "Imprint");
        }
        assert_eq!(memo.resolve(&de, "Imprint").await, Err(FetchFailure::Status(500)));
        assert_eq!(relay.calls(), 1);
        assert_that!(store.get("mt:de:Imprint").unwrap(), none());
    }

    #[rstest]
    #[tokio::test]
    async fn slow_relay_times_out(store: Arc<MemoryStore>) {
        let relay = Arc::new(
            ScriptedRelay::new([("Projects", "Projekte")]).with_delay(Duration::from_secs(30)),
        );
        let memo =
            TranslationMemo::with_timeout(relay.clone(), store.clone(), Duration::from_millis(20));
        let de = locale("de");

        assert_eq!(memo.resolve(&de, "Projects").await, Err(FetchFailure::Timeout));
        assert_eq!(memo.get_display_text(&de, "Projects"), "Projects");
        assert_eq!(memo.state(&de, "Projects"), MemoState::Failed(FetchFailure::Timeout));
    }

    #[rstest]
    #[tokio::test]
    async fn blank_translation_is_failure(store: Arc<MemoryStore>) {
        let relay = Arc::new(ScriptedRelay::new([("Projects", "  ")]));
        let memo = memo_with(&relay, &store);

        assert_eq!(memo.resolve(&locale("de"), "Projects").await, Err(FetchFailure::Empty));
    }

    #[rstest]
    #[tokio::test]
    async fn persisted_translation_skips_network(
        relay: Arc<ScriptedRelay>,
        store: Arc<MemoryStore>,
    ) {
        store.set("mt:de:Projects", "Vorhaben").unwrap();
        let memo = memo_with(&relay, &store);

        assert_eq!(memo.get_display_text(&locale("de"), "Projects"), "Vorhaben");
        assert_eq!(relay.calls(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn storage_failures_do_not_affect_cache(relay: Arc<ScriptedRelay>) {
        let memo = TranslationMemo::new(relay.clone(), Arc::new(FailingStore));
        let de = locale("de");

        assert_eq!(memo.resolve(&de, "Projects").await, Ok("Projekte".to_string()));
        assert_eq!(memo.get_display_text(&de, "Projects"), "Projekte");
    }

    #[rstest]
    #[tokio::test]
    async fn blank_text_is_returned_verbatim(relay: Arc<ScriptedRelay>, store: Arc<MemoryStore>) {
        let memo = memo_with(&relay, &store);

        assert_eq!(memo.get_display_text(&locale("de"), "  "), "  ");
        assert_eq!(memo.resolve(&locale("de"), "").await, Ok(String::new()));
        assert_eq!(relay.calls(), 0);
    }

    #[rstest]
    fn without_runtime_pair_stays_uncached(relay: Arc<ScriptedRelay>, store: Arc<MemoryStore>) {
        let memo = memo_with(&relay, &store);
        let de = locale("de");

        assert_eq!(memo.get_display_text(&de, "Projects"), "Projects");
        assert_eq!(memo.state(&de, "Projects"), MemoState::Uncached);
        assert_eq!(
            futures::executor::block_on(memo.resolve(&de, "Projects")),
            Err(FetchFailure::NoRuntime)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn subscribers_hear_completed_fetches(
        relay: Arc<ScriptedRelay>,
        store: Arc<MemoryStore>,
    ) {
        let memo = memo_with(&relay, &store);
        let mut events = memo.subscribe();

        let _ = memo.get_display_text(&locale("de"), "Publications");
        let event = events.recv().await.unwrap();

        assert_eq!(
            event,
            TranslationReady {
                locale: locale("de"),
                text: "Publications".to_string(),
                translation: "Publikationen".to_string(),
            }
        );
    }

    #[rstest]
    #[tokio::test]
    async fn settle_waits_for_background_fetches(store: Arc<MemoryStore>) {
        let relay = Arc::new(
            ScriptedRelay::new([("Projects", "Projekte"), ("Publications", "Publikationen")])
                .with_delay(Duration::from_millis(20)),
        );
        let memo = memo_with(&relay, &store);
        let de = locale("de");

        assert_eq!(memo.get_display_text(&de, "Projects"), "Projects");
        assert_eq!(memo.get_display_text(&de, "Publications"), "Publications");
        assert_eq!(memo.get_display_text(&de, "Imprint"), "Imprint");

        assert_eq!(memo.settle().await, 3);

        assert_eq!(memo.state(&de, "Projects"), MemoState::Cached("Projekte".to_string()));
        assert_eq!(memo.state(&de, "Imprint"), MemoState::Failed(FetchFailure::Status(500)));
        assert_that!(store.get("mt:de:Publications").unwrap(), some(eq("Publikationen")));
        assert_eq!(memo.settle().await, 0);
    }

    /// Memory store that counts single-key removals.
    #[derive(Debug, Default)]
    struct CountingStore {
        inner: MemoryStore,
        single_removes: AtomicUsize,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, crate::storage::StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), crate::storage::StorageError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), crate::storage::StorageError> {
            self.single_removes.fetch_add(1, Ordering::SeqCst);
            self.inner.remove(key)
        }

        fn remove_matching(
            &self,
            predicate: &dyn Fn(&str) -> bool,
        ) -> Result<usize, crate::storage::StorageError> {
            self.inner.remove_matching(predicate)
        }

        fn keys(&self) -> Result<Vec<String>, crate::storage::StorageError> {
            self.inner.keys()
        }
    }

    #[rstest]
    #[tokio::test]
    async fn clear_removes_persisted_translations_in_one_batch(relay: Arc<ScriptedRelay>) {
        let store = Arc::new(CountingStore::default());
        store.set("mt:de:Projects", "Projekte").unwrap();
        store.set("mt:de:Publications", "Publikationen").unwrap();
        store.set("lang", "de").unwrap();
        let memo = TranslationMemo::new(relay.clone(), store.clone());

        let stats = memo.clear();

        assert_eq!(stats, ClearStats { in_memory: 0, persisted: 2 });
        assert_eq!(store.single_removes.load(Ordering::SeqCst), 0);
        assert_that!(store.keys().unwrap(), eq(&vec!["lang".to_string()]));
    }

    #[rstest]
    #[tokio::test]
    async fn clear_and_forget_invalidate(relay: Arc<ScriptedRelay>, store: Arc<MemoryStore>) {
        store.set("lang", "de").unwrap();
        let memo = memo_with(&relay, &store);
        let de = locale("de");
        memo.resolve(&de, "Projects").await.unwrap();
        memo.resolve(&de, "Publications").await.unwrap();
        let _ = memo.resolve(&de, "Imprint").await;

        assert!(memo.forget(&de, "Publications"));
        assert_eq!(memo.state(&de, "Publications"), MemoState::Uncached);
        assert_that!(store.get("mt:de:Publications").unwrap(), none());

        let stats = memo.clear();

        assert_eq!(stats, ClearStats { in_memory: 2, persisted: 1 });
        assert_eq!(memo.state(&de, "Projects"), MemoState::Uncached);
        assert_that!(store.get("lang").unwrap(), some(eq("de")));

        assert_eq!(memo.resolve(&de, "Projects").await, Ok("Projekte".to_string()));
        assert_eq!(relay.calls(), 4);
    }
}
