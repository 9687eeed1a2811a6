//! GitHub GraphQL client for the public contribution calendar.

use std::path::Path;

use chrono::{
    DateTime,
    Months,
    SecondsFormat,
    TimeDelta,
    Utc,
};
use reqwest::header::{
    AUTHORIZATION,
    USER_AGENT,
};
use reqwest::{
    Client,
    Url,
};
use serde_json::{
    Value,
    json,
};

use super::{
    ContribError,
    WeeklyContributions,
};
use crate::relay::error_body;

/// Public GitHub GraphQL endpoint.
pub const DEFAULT_GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Contribution calendar of one user over a date range.
const CONTRIBUTIONS_QUERY: &str = "
  query($login:String!, $from:DateTime!, $to:DateTime!) {
    user(login:$login) {
      contributionsCollection(from:$from, to:$to) {
        totalCommitContributions
        contributionCalendar {
          weeks { contributionDays { contributionCount } }
        }
      }
    }
  }
";

/// Client for the contribution calendar of public GitHub profiles.
#[derive(Clone)]
pub struct GithubContributions {
    /// Shared HTTP client.
    client: Client,
    /// GraphQL endpoint.
    endpoint: Url,
    /// Bearer token; the GraphQL API rejects anonymous requests.
    token: Option<String>,
}

impl std::fmt::Debug for GithubContributions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubContributions")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl GithubContributions {
    /// A blank token counts as no token.
    #[must_use]
    pub fn new(client: Client, endpoint: Url, token: Option<String>) -> Self {
        let token = token.filter(|token| !token.trim().is_empty());
        Self { client, endpoint, token }
    }

    /// Contributions of `login` over the year up to now.
    ///
    /// # Errors
    /// See [`Self::fetch_range`].
    pub async fn fetch(&self, login: &str) -> Result<WeeklyContributions, ContribError> {
        let to = Utc::now();
        let from = to.checked_sub_months(Months::new(12)).unwrap_or(to - TimeDelta::days(365));
        self.fetch_range(login, from, to).await
    }

    /// Like [`Self::fetch`], but any failure yields
    /// [`WeeklyContributions::zeroed`] so the snapshot can always be written.
    pub async fn fetch_or_zeroed(&self, login: &str) -> WeeklyContributions {
        self.fetch(login).await.unwrap_or_else(|e| {
            tracing::warn!("Failed to fetch contributions for {login}, using zeros: {e}");
            WeeklyContributions::zeroed()
        })
    }

    /// Contributions of `login` between `from` and `to`.
    ///
    /// # Errors
    /// - [`ContribError::MissingToken`] without a token
    /// - [`ContribError::Status`] on a non-2xx response
    /// - [`ContribError::Transport`] when the request fails or the body is not JSON
    pub async fn fetch_range(
        &self,
        login: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<WeeklyContributions, ContribError> {
        let token = self.token.as_deref().ok_or(ContribError::MissingToken)?;

        tracing::debug!(login, %from, %to, "Fetching contribution calendar");
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, format!("bearer {token}"))
            .header(USER_AGENT, concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .json(&json!({
                "query": CONTRIBUTIONS_QUERY,
                "variables": {
                    "login": login,
                    "from": from.to_rfc3339_opts(SecondsFormat::Millis, true),
                    "to": to.to_rfc3339_opts(SecondsFormat::Millis, true),
                },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContribError::Status {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let body: Value = response.json().await?;
        Ok(WeeklyContributions::from_graphql(&body))
    }
}

/// Writes the `{ "total", "weeks" }` snapshot, creating parent directories.
///
/// # Errors
/// Returns [`ContribError::Io`] if the file cannot be written.
pub fn write_snapshot(path: &Path, contributions: &WeeklyContributions) -> Result<(), ContribError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(contributions)?;
    std::fs::write(path, content)?;
    tracing::info!(total = contributions.total, "Wrote {:?}", path);
    Ok(())
}
