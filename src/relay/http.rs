//! Relay that forwards to the site's `/api/translate` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client,
    Url,
};
use serde::{
    Deserialize,
    Serialize,
};

use super::{
    RelayError,
    TranslationRelay,
    error_body,
};
use crate::locale::Locale;

/// Request body sent to the relay endpoint.
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    /// Source text.
    text: &'a str,
    /// Target locale tag.
    target: &'a str,
}

/// Success body of the relay endpoint.
#[derive(Debug, Deserialize)]
struct TranslateResponse {
    /// Translated text; absent when the relay had nothing to offer.
    translation: Option<String>,
}

/// POSTs `{"text", "target"}` to `{endpoint}?target={locale}` and reads `translation`.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    /// Client carrying the request timeout.
    client: Client,
    /// Relay URL without the `target` query.
    endpoint: Url,
}

impl HttpRelay {
    /// # Errors
    /// Returns [`RelayError::Client`] if the HTTP client cannot be built.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Client(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl TranslationRelay for HttpRelay {
    async fn translate(&self, text: &str, target: &Locale) -> Result<String, RelayError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("target", target.as_str());

        tracing::debug!(target = %target, "Requesting machine translation");
        let response = self
            .client
            .post(url)
            .json(&TranslateRequest { text, target: target.as_str() })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status { status: status.as_u16(), body: error_body(response).await });
        }

        let body: TranslateResponse = response.json().await?;
        body.translation
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(RelayError::EmptyTranslation)
    }
}
