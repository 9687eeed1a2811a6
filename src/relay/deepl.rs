//! Relay that talks to the DeepL API directly.
//!
//! Without an API key the relay echoes its input, so a site without
//! credentials keeps rendering source text instead of failing.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{
    Client,
    Url,
};
use serde::Deserialize;

use super::{
    Glossary,
    RelayError,
    TranslationRelay,
    error_body,
};
use crate::locale::Locale;

/// Free-tier DeepL endpoint.
pub const DEFAULT_DEEPL_URL: &str = "https://api-free.deepl.com/v2/translate";

/// Response body of `POST /v2/translate`.
#[derive(Debug, Deserialize)]
struct DeeplResponse {
    /// One entry per submitted text.
    #[serde(default)]
    translations: Vec<DeeplTranslation>,
}

/// One entry of [`DeeplResponse::translations`].
#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    /// Translated text.
    text: String,
}

/// Relay calling DeepL's `/v2/translate` with the account's API key.
#[derive(Clone)]
pub struct DeeplRelay {
    /// Client carrying the request timeout.
    client: Client,
    /// Translate endpoint (free or pro host).
    api_url: Url,
    /// `None` switches the relay to echo mode.
    api_key: Option<String>,
    /// Applied to every translation.
    glossary: Glossary,
}

impl std::fmt::Debug for DeeplRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeeplRelay")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("glossary", &self.glossary)
            .finish_non_exhaustive()
    }
}

impl DeeplRelay {
    #[must_use]
    pub fn new(client: Client, api_url: Url, api_key: Option<String>, glossary: Glossary) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        Self { client, api_url, api_key, glossary }
    }

    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl TranslationRelay for DeeplRelay {
    async fn translate(&self, text: &str, target: &Locale) -> Result<String, RelayError> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!("No DeepL API key configured, echoing source text");
            return Ok(text.to_string());
        };

        let target_lang = target.as_str().to_uppercase();
        let response = self
            .client
            .post(self.api_url.clone())
            .header(AUTHORIZATION, format!("DeepL-Auth-Key {api_key}"))
            .form(&[("text", text), ("target_lang", target_lang.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status { status: status.as_u16(), body: error_body(response).await });
        }

        let body: DeeplResponse = response.json().await?;
        let translated = body.translations.into_iter().next().map_or_else(|| text.to_string(), |t| t.text);

        Ok(self.glossary.apply(&translated))
    }
}
