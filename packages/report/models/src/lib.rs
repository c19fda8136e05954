#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! City health report types.
//!
//! A [`Report`] is a pure projection of the issue store at generation time:
//! it is built once by the weekly aggregator, serialized to JSON for the
//! dashboard, and never mutated afterwards. Field names are `snake_case`
//! on the wire.

use chrono::{DateTime, Utc};
use civicsense_issue_models::{IssueCategory, IssueStatus};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The full weekly city health report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Instant the report was computed for.
    pub generated_at: DateTime<Utc>,
    /// Trailing window the report covers.
    pub period: ReportPeriod,
    /// Headline counts and scores.
    pub summary: ReportSummary,
    /// Issue counts per category, most frequent first.
    pub category_breakdown: Vec<CategoryCount>,
    /// Issue counts per status.
    pub status_breakdown: Vec<StatusCount>,
    /// Densest grid cells, at most [`MAX_HOTSPOTS`].
    pub hotspots: Vec<Hotspot>,
    /// Week-over-week comparison.
    pub trend: Trend,
    /// Rule-based observations, in evaluation order.
    pub ai_insights: Vec<Insight>,
    /// Suggested actions for city staff.
    pub recommendations: Vec<String>,
}

/// Maximum number of hotspots included in a report.
pub const MAX_HOTSPOTS: usize = 5;

/// Time window covered by a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    /// Window start (inclusive).
    pub start: DateTime<Utc>,
    /// Window end (inclusive), equal to the generation instant.
    pub end: DateTime<Utc>,
    /// Window length in days.
    pub days: u32,
}

/// Headline numbers for the report window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Issues created in the window.
    pub total_issues: u64,
    /// Of those, how many are resolved.
    pub resolved: u64,
    /// Of those, how many are still pending.
    pub pending: u64,
    /// Of those, how many are in progress.
    pub in_progress: u64,
    /// Percentage of window issues that are resolved, `[0, 100]`.
    pub resolution_rate: f64,
    /// 100 minus the percentage of pending issues, `[0, 100]`.
    pub health_score: f64,
}

/// Number of issues in one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    /// The category.
    pub category: IssueCategory,
    /// Issues in that category.
    pub count: u64,
}

/// Number of issues with one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    /// The status.
    pub status: IssueStatus,
    /// Issues with that status.
    pub count: u64,
}

/// Grid-cell key of a hotspot: coordinates rounded to two decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotspotLocation {
    /// Rounded latitude.
    pub lat: f64,
    /// Rounded longitude.
    pub lng: f64,
}

/// A grid cell with reported issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// The cell key (not a centroid).
    pub location: HotspotLocation,
    /// Issues inside the cell.
    pub issue_count: u64,
    /// Distinct categories seen in the cell.
    pub categories: Vec<IssueCategory>,
}

/// Direction of the week-over-week change.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrendDirection {
    /// More than 10% more issues than last week.
    Increasing,
    /// More than 10% fewer issues than last week.
    Decreasing,
    /// Within the ±10% band.
    Stable,
}

/// Week-over-week issue volume comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// Classified direction.
    pub direction: TrendDirection,
    /// Percentage change from last week to this week.
    pub change_percent: f64,
    /// Issues created in the last 7 days.
    pub this_week: u64,
    /// Issues created in the 7 days before that.
    pub last_week: u64,
}

/// Tone of an [`Insight`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InsightKind {
    /// Something is going well.
    Positive,
    /// Needs attention.
    Warning,
    /// Needs immediate action.
    Critical,
    /// Neutral information.
    Info,
}

/// A single rule-based observation about the report window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    /// Tone of the message. Serialized as `type`.
    #[serde(rename = "type")]
    pub kind: InsightKind,
    /// Human-readable message.
    pub message: String,
}

impl Insight {
    /// Creates an insight.
    #[must_use]
    pub fn new(kind: InsightKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
