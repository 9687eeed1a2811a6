//! Active-locale tracking and dictionary lookup.

use std::sync::Arc;

use tokio::sync::watch;

use crate::dictionary::Dictionaries;
use crate::locale::{
    Locale,
    SupportedLocales,
};
use crate::storage::KeyValueStore;

/// Storage key of the persisted locale preference.
pub const LOCALE_STORAGE_KEY: &str = "lang";

/// Result of looking up a key in the current locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The dictionary of the current locale has the key.
    Dictionary(String),
    /// Default locale without a dictionary entry: the source text is final.
    Source(String),
    /// Non-default locale without a dictionary entry. `source` is shown until a
    /// machine translation into `locale` is available.
    Pending { locale: Locale, source: String },
}

impl Lookup {
    /// Text to display right now.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Dictionary(text) | Self::Source(text) => text,
            Self::Pending { source, .. } => source,
        }
    }

    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Dictionary(text) | Self::Source(text) => text,
            Self::Pending { source, .. } => source,
        }
    }
}

/// Single source of truth for the active locale and for `t(key)`.
///
/// One instance is built at startup and shared (`Arc`) with every consumer.
/// Locale changes are published on a `watch` channel so consumers can re-render.
#[derive(Debug)]
pub struct LocaleResolver {
    /// Locales the user may switch to.
    supported: SupportedLocales,
    /// Static dictionaries of every supported locale.
    dictionaries: Arc<Dictionaries>,
    /// Where the locale preference is persisted.
    store: Arc<dyn KeyValueStore>,
    /// Current locale; always a member of `supported`.
    current: watch::Sender<Locale>,
}

impl LocaleResolver {
    /// Restores the active locale.
    ///
    /// Order: persisted preference, then `language_hint` if it names a supported
    /// non-default locale, then the default locale. Nothing is written back.
    pub fn initialize(
        supported: SupportedLocales,
        dictionaries: Arc<Dictionaries>,
        store: Arc<dyn KeyValueStore>,
        language_hint: Option<&str>,
    ) -> Self {
        let initial = Self::restore_locale(&supported, store.as_ref(), language_hint);
        tracing::debug!(locale = %initial, "Initialized locale");

        let (current, _) = watch::channel(initial);
        Self { supported, dictionaries, store, current }
    }

    /// Determines the startup locale.
    fn restore_locale(
        supported: &SupportedLocales,
        store: &dyn KeyValueStore,
        language_hint: Option<&str>,
    ) -> Locale {
        match store.get(LOCALE_STORAGE_KEY) {
            Ok(Some(stored)) => match Locale::parse(&stored) {
                Ok(locale) if supported.contains(&locale) => return locale,
                _ => tracing::debug!("Ignoring unsupported stored locale: {}", stored),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read stored locale: {}", e),
        }

        language_hint
            .and_then(|hint| supported.match_hint(hint))
            .filter(|locale| !supported.is_default(locale))
            .unwrap_or_else(|| supported.default_locale())
            .clone()
    }

    #[must_use]
    pub fn current_locale(&self) -> Locale {
        self.current.borrow().clone()
    }

    #[must_use]
    pub const fn supported(&self) -> &SupportedLocales {
        &self.supported
    }

    /// Switches to `locale` and persists the choice.
    ///
    /// Unsupported locales are ignored and `false` is returned. Storage failures
    /// are logged and do not affect the switch.
    pub fn set_locale(&self, locale: &Locale) -> bool {
        if !self.supported.contains(locale) {
            tracing::debug!(locale = %locale, "Ignoring unsupported locale");
            return false;
        }

        let changed = self.current.send_if_modified(|current| {
            if current == locale {
                false
            } else {
                *current = locale.clone();
                true
            }
        });
        if changed {
            tracing::debug!(locale = %locale, "Locale changed");
        }

        if let Err(e) = self.store.set(LOCALE_STORAGE_KEY, locale.as_str()) {
            tracing::warn!("Failed to persist locale {}: {}", locale, e);
        }
        true
    }

    /// [`set_locale`](Self::set_locale) from an unparsed tag. Unparsable tags are ignored.
    pub fn set_locale_tag(&self, tag: &str) -> bool {
        Locale::parse(tag).is_ok_and(|locale| self.set_locale(&locale))
    }

    /// Switches to the next supported locale (language toggle) and returns it.
    pub fn cycle_locale(&self) -> Locale {
        let next = self.supported.next_after(&self.current.borrow()).clone();
        self.set_locale(&next);
        next
    }

    /// Receiver that observes every locale change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Locale> {
        self.current.subscribe()
    }

    /// Default-locale display text of `key`: its default dictionary entry, or the key itself.
    #[must_use]
    pub fn source_text(&self, key: &str) -> String {
        self.dictionaries
            .get(self.supported.default_locale(), key)
            .unwrap_or(key)
            .to_string()
    }

    /// Looks `key` up in the current locale's dictionary.
    #[must_use]
    pub fn translate(&self, key: &str) -> Lookup {
        let locale = self.current_locale();

        if let Some(value) = self.dictionaries.get(&locale, key) {
            return Lookup::Dictionary(value.to_string());
        }

        let source = self.source_text(key);
        if self.supported.is_default(&locale) {
            Lookup::Source(source)
        } else {
            tracing::trace!(locale = %locale, key, "Dictionary miss");
            Lookup::Pending { locale, source }
        }
    }

    /// Synchronous display string for `key`.
    #[must_use]
    pub fn t(&self, key: &str) -> String {
        self.translate(key).into_text()
    }
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
        en_de,
        locale,
        sample_dictionaries,
    };

    fn resolver_with(store: Arc<dyn KeyValueStore>, hint: Option<&str>) -> LocaleResolver {
        LocaleResolver::initialize(en_de(), Arc::new(sample_dictionaries()), store, hint)
    }

    #[rstest]
    #[case::nothing(None, None, "en")]
    #[case::hint_de(None, Some("de-DE"), "de")]
    #[case::hint_unsupported(None, Some("ja-JP"), "en")]
    #[case::hint_default(None, Some("en-US"), "en")]
    #[case::stored_wins(Some("en"), Some("de-DE"), "en")]
    #[case::stored_de(Some("de"), None, "de")]
    #[case::stored_garbage(Some("klingon!"), Some("de"), "de")]
    #[case::stored_unsupported(Some("fr"), None, "en")]
    fn initialize_restores_locale(
        #[case] stored: Option<&str>,
        #[case] hint: Option<&str>,
        #[case] expected: &str,
    ) {
        let store = Arc::new(MemoryStore::new());
        if let Some(stored) = stored {
            store.set(LOCALE_STORAGE_KEY, stored).unwrap();
        }

        let resolver = resolver_with(store.clone(), hint);

        assert_that!(resolver.current_locale().as_str(), eq(expected));
        // initialization never writes back
        assert_that!(store.get(LOCALE_STORAGE_KEY).unwrap().as_deref(), eq(stored));
    }

    #[rstest]
    fn initialize_survives_storage_failure() {
        let resolver = resolver_with(Arc::new(FailingStore), Some("de"));

        assert_that!(resolver.current_locale().as_str(), eq("de"));
    }

    #[rstest]
    fn set_locale_persists_and_round_trips() {
        let store = Arc::new(MemoryStore::new());
        let resolver = resolver_with(store.clone(), None);

        assert_that!(resolver.set_locale(&locale("de")), eq(true));
        assert_that!(resolver.current_locale().as_str(), eq("de"));

        let reloaded = resolver_with(store, Some("en"));
        assert_that!(reloaded.current_locale().as_str(), eq("de"));
    }

    #[rstest]
    fn set_locale_rejects_unsupported() {
        let store = Arc::new(MemoryStore::new());
        let resolver = resolver_with(store.clone(), None);

        assert_that!(resolver.set_locale(&locale("fr")), eq(false));
        assert_that!(resolver.set_locale_tag("not a locale"), eq(false));

        assert_that!(resolver.current_locale().as_str(), eq("en"));
        assert_that!(store.get(LOCALE_STORAGE_KEY).unwrap(), none());
    }

    #[rstest]
    fn set_locale_ignores_storage_failure() {
        let resolver = resolver_with(Arc::new(FailingStore), None);

        assert_that!(resolver.set_locale_tag("DE"), eq(true));
        assert_that!(resolver.current_locale().as_str(), eq("de"));
    }

    #[rstest]
    fn set_locale_tag_ignores_script_case() {
        let supported = SupportedLocales::new(locale("en"), [locale("zh-Hant")]).unwrap();
        let resolver = LocaleResolver::initialize(
            supported,
            Arc::new(Dictionaries::new()),
            Arc::new(MemoryStore::new()),
            None,
        );

        assert_that!(resolver.set_locale_tag("zh-hant"), eq(true));
        assert_that!(resolver.current_locale().as_str(), eq("zh-Hant"));
    }

    #[tokio::test]
    async fn subscribers_observe_changes_only() {
        let resolver = resolver_with(Arc::new(MemoryStore::new()), None);
        let mut rx = resolver.subscribe();

        resolver.set_locale(&locale("en"));
        assert!(!rx.has_changed().unwrap());

        resolver.set_locale(&locale("de"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_str(), "de");
    }

    #[rstest]
    fn cycle_locale_toggles() {
        let resolver = resolver_with(Arc::new(MemoryStore::new()), None);

        assert_eq!(resolver.cycle_locale().as_str(), "de");
        assert_eq!(resolver.cycle_locale().as_str(), "en");
    }

    #[rstest]
    fn translate_prefers_dictionary() {
        let resolver = resolver_with(Arc::new(MemoryStore::new()), Some("de"));

        assert_eq!(
            resolver.translate("nav.resume"),
            Lookup::Dictionary("Lebenslauf".to_string())
        );
    }

    #[rstest]
    fn translate_default_locale_prefers_dictionary() {
        let resolver = resolver_with(Arc::new(MemoryStore::new()), None);

        assert_eq!(resolver.translate("nav.resume"), Lookup::Dictionary("Resume".to_string()));
        assert_eq!(resolver.t("nav.resume"), "Resume");
    }

    #[rstest]
    fn translate_default_locale_miss_is_source() {
        let resolver = resolver_with(Arc::new(MemoryStore::new()), None);

        assert_eq!(
            resolver.translate("Publications"),
            Lookup::Source("Publications".to_string())
        );
        assert_eq!(resolver.t("Publications"), "Publications");
    }

    #[rstest]
    fn translate_non_default_miss_is_pending() {
        let resolver = resolver_with(Arc::new(MemoryStore::new()), Some("de"));

        let lookup = resolver.translate("nav.projects");

        assert_eq!(
            lookup,
            Lookup::Pending { locale: locale("de"), source: "nav.projects".to_string() }
        );
        assert_eq!(lookup.text(), "nav.projects");
        assert_eq!(resolver.t("Publications"), "Publications");
    }
}
