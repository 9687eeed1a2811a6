//! Public GitHub contribution calendar: fetch, weekly bucketing and the
//! `github-contrib.json` snapshot the site reads at build time.

mod calendar;
mod github;

use thiserror::Error;

pub use calendar::{
    ContributionStats,
    DEFAULT_SPARKLINE_BUCKETS,
    WEEKS_PER_YEAR,
    WeeklyContributions,
};
pub use github::{
    DEFAULT_GITHUB_GRAPHQL_URL,
    GithubContributions,
    write_snapshot,
};

/// Failure to fetch or write contribution data.
#[derive(Error, Debug)]
pub enum ContribError {
    #[error("No GitHub token configured (set GH_TOKEN or GITHUB_TOKEN)")]
    MissingToken,

    #[error("GitHub request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GitHub responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to write contribution snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode contribution snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}
