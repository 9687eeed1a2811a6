//! Weekly contribution counts and the numbers derived from them.

use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

/// Length of a contribution year in weeks.
pub const WEEKS_PER_YEAR: usize = 52;

/// Number of points in the hero sparkline.
pub const DEFAULT_SPARKLINE_BUCKETS: usize = 6;

/// One year of contributions, summed per week. Serializes to the snapshot
/// file format `{ "total": n, "weeks": [..] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyContributions {
    /// Commit contributions over the year.
    pub total: u64,
    /// Contributions per calendar week, oldest first.
    pub weeks: Vec<u64>,
}

/// Summary shown next to the yearly bar graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContributionStats {
    /// Sum of the weeks shown.
    pub total: u64,
    /// Busiest week.
    pub max: u64,
    /// Average per week, in tenths (`23` reads as `2.3`).
    pub avg_tenths: u64,
}

impl ContributionStats {
    /// Average per week with one decimal, e.g. `"2.3"`.
    #[must_use]
    pub fn average(&self) -> String {
        format!("{}.{}", self.avg_tenths / 10, self.avg_tenths % 10)
    }
}

/// Sum of `contributionCount` over the days of one calendar week.
fn week_sum(week: &Value) -> u64 {
    week.get("contributionDays")
        .and_then(Value::as_array)
        .map_or(0, |days| {
            days.iter()
                .filter_map(|day| day.get("contributionCount").and_then(Value::as_u64))
                .sum()
        })
}

impl WeeklyContributions {
    /// A year of empty weeks. Written whenever the real numbers are unavailable.
    #[must_use]
    pub fn zeroed() -> Self {
        Self { total: 0, weeks: vec![0; WEEKS_PER_YEAR] }
    }

    /// Reads a `contributionsCollection` GraphQL response. Missing or
    /// mistyped pieces count as zero; a response without a calendar yields
    /// a zeroed year.
    #[must_use]
    pub fn from_graphql(response: &Value) -> Self {
        let collection = response.pointer("/data/user/contributionsCollection");

        let weeks: Vec<u64> = match collection
            .and_then(|c| c.pointer("/contributionCalendar/weeks"))
            .and_then(Value::as_array)
        {
            Some(weeks) => weeks.iter().map(week_sum).collect(),
            None => vec![0; WEEKS_PER_YEAR],
        };

        let total = collection
            .and_then(|c| c.get("totalCommitContributions"))
            .and_then(Value::as_u64)
            .unwrap_or_else(|| weeks.iter().sum());

        Self { total, weeks }
    }

    /// The trailing `n` weeks (all of them when there are fewer).
    #[must_use]
    pub fn last_weeks(&self, n: usize) -> &[u64] {
        self.weeks.get(self.weeks.len().saturating_sub(n)..).unwrap_or_default()
    }

    /// Cumulative sums over `buckets` equal slices of the weeks.
    ///
    /// Point `i` sums the first `(i + 1) * size` weeks, where `size` is
    /// `ceil(weeks / buckets)` and at least one. Later points saturate at the
    /// full sum when the weeks run out.
    #[must_use]
    pub fn sparkline(&self, buckets: usize) -> Vec<u64> {
        let size = self.weeks.len().div_ceil(buckets.max(1)).max(1);
        (1..=buckets).map(|i| self.weeks.iter().take(i.saturating_mul(size)).sum()).collect()
    }

    /// Total, maximum and average over the last [`WEEKS_PER_YEAR`] weeks, the
    /// bars the yearly graph shows. A one-year range often spans 53 calendar
    /// weeks; the oldest one is left out.
    #[must_use]
    pub fn stats(&self) -> ContributionStats {
        let weeks = self.last_weeks(WEEKS_PER_YEAR);
        let total: u64 = weeks.iter().sum();
        let max = weeks.iter().copied().max().unwrap_or(0);
        let count = u64::try_from(weeks.len()).unwrap_or(u64::MAX);
        // round half up to one decimal
        let avg_tenths = if count == 0 {
            0
        } else {
            total.saturating_mul(20).saturating_add(count) / count.saturating_mul(2)
        };

        ContributionStats { total, max, avg_tenths }
    }
}
