//! Week-over-week volume comparison.

use chrono::{DateTime, TimeDelta, Utc};
use civicsense_report_models::{Trend, TrendDirection};

use crate::source::{CreatedWindow, IssueSource, SourceError};
use crate::summary::round2;

/// Changes within ±this many percent are reported as stable.
pub const STABLE_BAND_PERCENT: f64 = 10.0;

/// Percentage change from `last_week` to `this_week`.
///
/// When last week had no issues the change saturates: 0 if this week is
/// also empty, otherwise 100.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn change_percent(this_week: u64, last_week: u64) -> f64 {
    if last_week > 0 {
        (this_week as f64 - last_week as f64) / last_week as f64 * 100.0
    } else if this_week == 0 {
        0.0
    } else {
        100.0
    }
}

/// Classifies a percentage change against the stable band.
#[must_use]
pub fn direction(change_percent: f64) -> TrendDirection {
    if change_percent > STABLE_BAND_PERCENT {
        TrendDirection::Increasing
    } else if change_percent < -STABLE_BAND_PERCENT {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// Builds a [`Trend`] from the two weekly counts.
#[must_use]
pub fn from_counts(this_week: u64, last_week: u64) -> Trend {
    let change = change_percent(this_week, last_week);
    Trend {
        direction: direction(change),
        change_percent: round2(change),
        this_week,
        last_week,
    }
}

/// Compares the seven days up to `now` against the seven days before.
///
/// "This week" has no upper bound; "last week" is `[now - 14d, now - 7d)`.
///
/// # Errors
///
/// Returns [`SourceError`] if either count query fails.
pub async fn analyze(source: &dyn IssueSource, now: DateTime<Utc>) -> Result<Trend, SourceError> {
    let week_ago = now - TimeDelta::days(7);
    let two_weeks_ago = now - TimeDelta::days(14);

    let this_week = source.count(CreatedWindow::since(week_ago)).await?;
    let last_week = source
        .count(CreatedWindow::half_open(two_weeks_ago, week_ago))
        .await?;

    log::debug!("Trend counts: this_week={this_week} last_week={last_week}");

    Ok(from_counts(this_week, last_week))
}

#[cfg(test)]
mod tests {
    use civicsense_issue_models::{IssueCategory, NewIssue};

    use super::*;
    use crate::memory::InMemoryIssueSource;

    #[test]
    fn empty_weeks_are_stable() {
        let trend = from_counts(0, 0);
        assert!(trend.change_percent.abs() < f64::EPSILON);
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn growth_from_nothing_saturates_at_100() {
        let trend = from_counts(5, 0);
        assert!((trend.change_percent - 100.0).abs() < f64::EPSILON);
        assert_eq!(trend.direction, TrendDirection::Increasing);
    }

    #[test]
    fn direction_band_edges() {
        assert_eq!(direction(10.0), TrendDirection::Stable);
        assert_eq!(direction(-10.0), TrendDirection::Stable);
        assert_eq!(direction(10.01), TrendDirection::Increasing);
        assert_eq!(direction(-10.01), TrendDirection::Decreasing);
        assert_eq!(direction(0.0), TrendDirection::Stable);
    }

    #[test]
    fn direction_matches_band_for_all_small_counts() {
        for this_week in 0..30 {
            for last_week in 0..30 {
                let change = change_percent(this_week, last_week);
                let expected = if change > 10.0 {
                    TrendDirection::Increasing
                } else if change < -10.0 {
                    TrendDirection::Decreasing
                } else {
                    TrendDirection::Stable
                };
                assert_eq!(from_counts(this_week, last_week).direction, expected);
            }
        }
    }

    #[test]
    fn halving_is_decreasing() {
        let trend = from_counts(5, 10);
        assert!((trend.change_percent - -50.0).abs() < f64::EPSILON);
        assert_eq!(trend.direction, TrendDirection::Decreasing);
    }

    #[tokio::test]
    async fn boundary_issue_counts_as_this_week() {
        let now = Utc::now();
        let source = InMemoryIssueSource::new();
        source.insert(
            NewIssue::new("boundary", IssueCategory::Other),
            now - TimeDelta::days(7),
        );
        source.insert(
            NewIssue::new("last week", IssueCategory::Other),
            now - TimeDelta::days(14),
        );
        source.insert(
            NewIssue::new("too old", IssueCategory::Other),
            now - TimeDelta::days(15),
        );

        let trend = analyze(&source, now).await.unwrap();
        assert_eq!(trend.this_week, 1);
        assert_eq!(trend.last_week, 1);
        assert_eq!(trend.direction, TrendDirection::Stable);
    }
}
