//! Headline counts, resolution rate, and health score.

use civicsense_issue_models::{Issue, IssueStatus};
use civicsense_report_models::ReportSummary;

/// Rounds to two decimal places, half away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of `total` that is `resolved`. An empty window counts as
/// fully resolved.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn resolution_rate(resolved: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    resolved as f64 / total as f64 * 100.0
}

/// 100 minus the percentage of `total` that is still `pending`, floored
/// at 0. In-progress issues are not penalized. An empty window scores 100.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn health_score(pending: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let pending_share = pending as f64 / total.max(1) as f64 * 100.0;
    (100.0 - pending_share).max(0.0)
}

/// Builds the report summary from the issues in the report window.
#[must_use]
pub fn summarize(issues: &[Issue]) -> ReportSummary {
    let count = |status: IssueStatus| issues.iter().filter(|i| i.status == status).count() as u64;

    let total_issues = issues.len() as u64;
    let resolved = count(IssueStatus::Resolved);
    let pending = count(IssueStatus::Pending);
    let in_progress = count(IssueStatus::InProgress);

    ReportSummary {
        total_issues,
        resolved,
        pending,
        in_progress,
        resolution_rate: round2(resolution_rate(resolved, total_issues)),
        health_score: round2(health_score(pending, total_issues)),
    }
}
