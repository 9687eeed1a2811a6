//! Display-string lookup combining dictionaries and machine translation.

use std::sync::Arc;

use crate::memo::TranslationMemo;
use crate::resolver::{
    LocaleResolver,
    Lookup,
};

/// What a text component asks for: "how do I show this key right now?"
///
/// Dictionary entries always win; a cached machine translation can never
/// shadow them because the dictionary is consulted first.
#[derive(Debug, Clone)]
pub struct Translator {
    /// Active locale and dictionaries.
    resolver: Arc<LocaleResolver>,
    /// Machine translations for dictionary misses.
    memo: TranslationMemo,
}

impl Translator {
    #[must_use]
    pub const fn new(resolver: Arc<LocaleResolver>, memo: TranslationMemo) -> Self {
        Self { resolver, memo }
    }

    #[must_use]
    pub fn resolver(&self) -> &LocaleResolver {
        &self.resolver
    }

    #[must_use]
    pub const fn memo(&self) -> &TranslationMemo {
        &self.memo
    }

    /// Display string for `key`, never blocking. A dictionary miss in a
    /// non-default locale shows the source text and starts a fetch.
    #[must_use]
    pub fn text(&self, key: &str) -> String {
        match self.resolver.translate(key) {
            Lookup::Dictionary(text) | Lookup::Source(text) => text,
            Lookup::Pending { locale, source } => self.memo.get_display_text(&locale, &source),
        }
    }

    /// Display string for `key` once any machine translation has settled.
    pub async fn text_resolved(&self, key: &str) -> String {
        match self.resolver.translate(key) {
            Lookup::Dictionary(text) | Lookup::Source(text) => text,
            Lookup::Pending { locale, source } => {
                self.memo.resolve(&locale, &source).await.unwrap_or(source)
            }
        }
    }
}
