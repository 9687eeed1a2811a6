//! folio-i18n
//!
//! Translation layer of a personal portfolio site: static dictionaries with
//! a persisted locale preference, plus a memo of machine translations for
//! strings the dictionaries do not cover.

pub mod config;
pub mod contrib;
pub mod dictionary;
pub mod locale;
pub mod memo;
pub mod relay;
pub mod resolver;
pub mod storage;
pub mod translator;

#[cfg(test)]
mod test_utils;

pub use locale::{
    Locale,
    SupportedLocales,
};
pub use memo::TranslationMemo;
pub use resolver::{
    LocaleResolver,
    Lookup,
};
pub use translator::Translator;
