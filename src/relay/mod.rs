//! Machine-translation relays.
//!
//! A relay turns a source text into a translation for a target locale. The
//! memo layer treats every error uniformly as "keep the source text".

mod deepl;
mod glossary;
mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::locale::Locale;

pub use deepl::{
    DEFAULT_DEEPL_URL,
    DeeplRelay,
};
pub use glossary::{
    Glossary,
    GlossaryTerm,
};
pub use http::HttpRelay;

/// Failure of a single relay call.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Relay request timed out")]
    Timeout,

    #[error("Relay request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Relay responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Relay response was not valid JSON: {0}")]
    Malformed(String),

    #[error("Relay response did not contain a translation")]
    EmptyTranslation,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}

#[async_trait]
pub trait TranslationRelay: std::fmt::Debug + Send + Sync {
    /// Translates `text` into `target`.
    ///
    /// # Errors
    /// Returns [`RelayError`] on transport failure, non-success status, a
    /// malformed body, or an empty translation.
    async fn translate(&self, text: &str, target: &Locale) -> Result<String, RelayError>;
}

/// Reads at most a short prefix of an error body for diagnostics.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    /// Longest body excerpt kept in an error.
    const MAX_LEN: usize = 200;

    let body = response.text().await.unwrap_or_default();
    body.chars().take(MAX_LEN).collect()
}
