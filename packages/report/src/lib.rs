#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weekly city health report generator.
//!
//! [`ReportGenerator`] reads the issues created in the trailing seven days
//! from an [`IssueSource`] and projects them into a [`Report`]: status and
//! category counts, resolution rate, health score, geographic hotspots, a
//! week-over-week trend, and rule-based insights and recommendations.
//!
//! Every report is recomputed from scratch. The generator holds no state
//! besides its source, so concurrent callers each get an independent
//! snapshot.

pub mod breakdown;
pub mod hotspots;
pub mod insights;
pub mod memory;
pub mod source;
pub mod summary;
pub mod trend;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use civicsense_report_models::{MAX_HOTSPOTS, Report, ReportPeriod};
use thiserror::Error;

pub use memory::InMemoryIssueSource;
pub use source::{CreatedWindow, IssueSource, SourceError, WindowEnd};

/// Length of the report window in days.
pub const REPORT_WINDOW_DAYS: u32 = 7;

/// Errors that can occur while generating a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A query against the issue store failed. No partial report is
    /// produced.
    #[error("Issue source error: {0}")]
    Source(#[from] SourceError),
}

/// Builds [`Report`]s from an injected [`IssueSource`].
#[derive(Clone)]
pub struct ReportGenerator {
    source: Arc<dyn IssueSource>,
}

impl std::fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportGenerator").finish_non_exhaustive()
    }
}

impl ReportGenerator {
    /// Creates a generator reading from `source`.
    #[must_use]
    pub fn new(source: Arc<dyn IssueSource>) -> Self {
        Self { source }
    }

    /// Generates the report for the seven days ending now.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Source`] if the issue store cannot be
    /// queried.
    pub async fn generate_weekly_report(&self) -> Result<Report, ReportError> {
        self.generate_weekly_report_at(Utc::now()).await
    }

    /// Generates the report for the seven days ending at `now`.
    ///
    /// The same instant anchors both the report window and the trend
    /// comparison.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Source`] if the issue store cannot be
    /// queried.
    pub async fn generate_weekly_report_at(&self, now: DateTime<Utc>) -> Result<Report, ReportError> {
        let start = now - TimeDelta::days(i64::from(REPORT_WINDOW_DAYS));

        let issues = self.source.fetch(CreatedWindow::closed(start, now)).await?;
        log::debug!(
            "Generating weekly report for {start} .. {now} over {} issues",
            issues.len()
        );

        let summary = summary::summarize(&issues);
        let category_breakdown = breakdown::by_category(&issues);
        let status_breakdown = breakdown::by_status(&issues);
        let hotspots = hotspots::identify(&issues, MAX_HOTSPOTS);
        let trend = trend::analyze(self.source.as_ref(), now).await?;
        let ai_insights = insights::generate(&summary, &category_breakdown);
        let recommendations = insights::recommendations(&category_breakdown);

        log::info!(
            "Weekly report: {} issues, health score {}, trend {}",
            summary.total_issues,
            summary.health_score,
            trend.direction
        );

        Ok(Report {
            generated_at: now,
            period: ReportPeriod {
                start,
                end: now,
                days: REPORT_WINDOW_DAYS,
            },
            summary,
            category_breakdown,
            status_breakdown,
            hotspots,
            trend,
            ai_insights,
            recommendations,
        })
    }
}
