//! Locale tags and the closed set of locales a site supports.

use std::fmt;
use std::str::FromStr;

use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use thiserror::Error;

/// Errors raised when parsing a locale tag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocaleError {
    #[error("Locale tag is empty")]
    Empty,

    #[error("Invalid locale tag '{0}': expected a language code such as \"en\" or \"de-DE\"")]
    Invalid(String),
}

/// A validated language tag in canonical form (`de`, `en-US`).
///
/// Parsing accepts `-` and `_` as separators and any letter case; the primary
/// language subtag is lowercased, a four-letter script is title-cased and a
/// two-letter region is uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale(String);

impl Locale {
    /// # Errors
    /// Returns [`LocaleError`] if the tag is empty or not shaped like a language code.
    pub fn parse(tag: &str) -> Result<Self, LocaleError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(LocaleError::Empty);
        }

        // "de-DE.UTF-8" style POSIX locales carry an encoding suffix
        let without_encoding = tag.split(['.', '@']).next().unwrap_or(tag);

        let mut parts = without_encoding.split(['-', '_']);
        let language = parts.next().unwrap_or_default();
        if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(LocaleError::Invalid(tag.to_string()));
        }

        let mut canonical = language.to_ascii_lowercase();
        for part in parts {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(LocaleError::Invalid(tag.to_string()));
            }
            canonical.push('-');
            canonical.push_str(&canonical_subtag(part));
        }

        Ok(Self(canonical))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag (`de` for `de-AT`).
    #[must_use]
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Locale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Self::parse(&tag).map_err(serde::de::Error::custom)
    }
}

/// Case of a subtag after the language: two-letter regions upper (`DE`),
/// four-letter scripts title (`Hant`), everything else lower.
fn canonical_subtag(part: &str) -> String {
    let alphabetic = part.chars().all(|c| c.is_ascii_alphabetic());
    match part.len() {
        2 if alphabetic => part.to_ascii_uppercase(),
        4 if alphabetic => part
            .chars()
            .enumerate()
            .map(|(i, c)| if i == 0 { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
            .collect(),
        _ => part.to_ascii_lowercase(),
    }
}

/// Errors raised when building a [`SupportedLocales`] set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupportedLocalesError {
    #[error("Locale '{0}' is listed more than once")]
    Duplicate(Locale),
}

/// The default locale plus the alternates a site ships.
///
/// The set is fixed once built. Iteration yields the default first, then the
/// alternates in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedLocales {
    /// Locale whose dictionary keys double as display text.
    default: Locale,
    /// Non-default locales.
    alternates: Vec<Locale>,
}

impl SupportedLocales {
    /// Builds the set. The default may also appear among `alternates`; it is
    /// dropped from there.
    ///
    /// # Errors
    /// Returns [`SupportedLocalesError::Duplicate`] when an alternate repeats.
    pub fn new(
        default: Locale,
        alternates: impl IntoIterator<Item = Locale>,
    ) -> Result<Self, SupportedLocalesError> {
        let mut unique: Vec<Locale> = Vec::new();
        for locale in alternates {
            if locale == default {
                continue;
            }
            if unique.contains(&locale) {
                return Err(SupportedLocalesError::Duplicate(locale));
            }
            unique.push(locale);
        }
        Ok(Self { default, alternates: unique })
    }

    #[must_use]
    pub const fn default_locale(&self) -> &Locale {
        &self.default
    }

    #[must_use]
    pub fn alternates(&self) -> &[Locale] {
        &self.alternates
    }

    #[must_use]
    pub fn is_default(&self, locale: &Locale) -> bool {
        &self.default == locale
    }

    #[must_use]
    pub fn contains(&self, locale: &Locale) -> bool {
        self.is_default(locale) || self.alternates.contains(locale)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locale> {
        std::iter::once(&self.default).chain(self.alternates.iter())
    }

    /// Matches a free-form language hint (browser or OS language) against the set.
    ///
    /// An exact tag match wins; otherwise the first locale sharing the hint's
    /// primary language is returned (`de-AT` matches `de`).
    #[must_use]
    pub fn match_hint(&self, hint: &str) -> Option<&Locale> {
        let hint = Locale::parse(hint).ok()?;
        self.iter()
            .find(|locale| **locale == hint)
            .or_else(|| self.iter().find(|locale| locale.language() == hint.language()))
    }

    /// The locale following `current` in iteration order, wrapping around.
    #[must_use]
    pub fn next_after(&self, current: &Locale) -> &Locale {
        let mut iter = self.iter().skip_while(|locale| *locale != current);
        iter.next();
        iter.next().unwrap_or(&self.default)
    }
}
