//! Rule-based insights and recommendations.
//!
//! Despite the `ai_insights` name on the wire, these are a fixed threshold
//! ladder over the summary numbers. No model is involved.

use civicsense_report_models::{CategoryCount, Insight, InsightKind, ReportSummary};

use crate::breakdown::top_category;
use crate::summary::{health_score, resolution_rate};

/// Returned when the window has no issues at all.
pub const CONTINUE_MONITORING: &str = "Continue monitoring city issues";

/// Builds the insight list: health tier, top category, resolution tier.
///
/// Tiers are chosen from the unrounded score and rate, recomputed from the
/// summary counts. The rounded summary fields are for display only.
#[must_use]
pub fn generate(summary: &ReportSummary, categories: &[CategoryCount]) -> Vec<Insight> {
    let mut insights = Vec::with_capacity(3);

    let score = health_score(summary.pending, summary.total_issues);
    insights.push(if score >= 80.0 {
        Insight::new(
            InsightKind::Positive,
            format!("City health score is excellent at {score:.0}/100"),
        )
    } else if score >= 60.0 {
        Insight::new(
            InsightKind::Warning,
            format!(
                "City health score is moderate at {score:.0}/100. There is room for improvement."
            ),
        )
    } else {
        Insight::new(
            InsightKind::Critical,
            format!("City health score is low at {score:.0}/100. Immediate action required."),
        )
    });

    if let Some((category, count)) = top_category(categories) {
        insights.push(Insight::new(
            InsightKind::Info,
            format!("Most reported issue type: {category} ({count} reports)"),
        ));
    }

    let rate = resolution_rate(summary.resolved, summary.total_issues);
    if rate < 50.0 {
        insights.push(Insight::new(
            InsightKind::Warning,
            format!("Low resolution rate of {rate:.1}%. Consider allocating more resources."),
        ));
    } else if rate > 80.0 {
        insights.push(Insight::new(
            InsightKind::Positive,
            format!("Excellent resolution rate of {rate:.1}%!"),
        ));
    }

    insights
}

/// Builds the recommendation list from the category breakdown.
#[must_use]
pub fn recommendations(categories: &[CategoryCount]) -> Vec<String> {
    let Some((category, count)) = top_category(categories) else {
        return vec![CONTINUE_MONITORING.to_string()];
    };

    let mut recommendations = vec![format!(
        "Prioritize resources for {} issues ({count} reports)",
        category.display_name()
    )];

    if let Some(action) = category.recommendation() {
        recommendations.push(action.to_string());
    }

    recommendations
}
