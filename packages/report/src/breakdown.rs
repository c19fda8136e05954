//! Per-category and per-status issue counts.

use civicsense_issue_models::{Issue, IssueCategory};
use civicsense_report_models::{CategoryCount, StatusCount};

/// Counts `keys` in first-seen order.
fn count_first_seen<K: PartialEq + Copy>(keys: impl Iterator<Item = K>) -> Vec<(K, u64)> {
    let mut counts: Vec<(K, u64)> = Vec::new();
    for key in keys {
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key, 1)),
        }
    }
    counts
}

/// Issue counts per category, most frequent first.
///
/// Categories with equal counts keep the order in which they first appear
/// in `issues`.
#[must_use]
pub fn by_category(issues: &[Issue]) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = count_first_seen(issues.iter().map(|i| i.category))
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Issue counts per status, in first-seen order.
#[must_use]
pub fn by_status(issues: &[Issue]) -> Vec<StatusCount> {
    count_first_seen(issues.iter().map(|i| i.status))
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect()
}

/// The most reported category, if any issues exist.
#[must_use]
pub fn top_category(breakdown: &[CategoryCount]) -> Option<(IssueCategory, u64)> {
    breakdown.first().map(|c| (c.category, c.count))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use civicsense_issue_models::{IssueStatus, NewIssue};

    use super::*;

    fn issue(id: i64, category: IssueCategory, status: IssueStatus) -> Issue {
        let mut issue = NewIssue::new("x", category).into_issue(id, Utc::now());
        issue.status = status;
        issue
    }

    #[test]
    fn categories_sorted_by_count_with_first_seen_ties() {
        let issues = vec![
            issue(1, IssueCategory::Pollution, IssueStatus::Pending),
            issue(2, IssueCategory::Garbage, IssueStatus::Pending),
            issue(3, IssueCategory::RoadDamage, IssueStatus::Pending),
            issue(4, IssueCategory::RoadDamage, IssueStatus::Pending),
            issue(5, IssueCategory::Garbage, IssueStatus::Pending),
            issue(6, IssueCategory::RoadDamage, IssueStatus::Pending),
        ];
        let breakdown = by_category(&issues);
        let order: Vec<(IssueCategory, u64)> =
            breakdown.iter().map(|c| (c.category, c.count)).collect();
        assert_eq!(
            order,
            vec![
                (IssueCategory::RoadDamage, 3),
                (IssueCategory::Garbage, 2),
                (IssueCategory::Pollution, 1),
            ]
        );
        assert_eq!(top_category(&breakdown), Some((IssueCategory::RoadDamage, 3)));
    }

    #[test]
    fn equal_counts_keep_first_seen_order() {
        let issues = vec![
            issue(1, IssueCategory::WaterLeak, IssueStatus::Pending),
            issue(2, IssueCategory::Garbage, IssueStatus::Pending),
        ];
        let breakdown = by_category(&issues);
        assert_eq!(breakdown[0].category, IssueCategory::WaterLeak);
        assert_eq!(breakdown[1].category, IssueCategory::Garbage);
    }

    #[test]
    fn breakdowns_sum_to_total() {
        let categories = IssueCategory::all();
        let statuses = IssueStatus::all();
        let issues: Vec<Issue> = (0..37)
            .map(|n: usize| {
                issue(
                    i64::try_from(n).unwrap(),
                    categories[n * 7 % categories.len()],
                    statuses[n * 5 % statuses.len()],
                )
            })
            .collect();

        let category_total: u64 = by_category(&issues).iter().map(|c| c.count).sum();
        let status_total: u64 = by_status(&issues).iter().map(|s| s.count).sum();
        assert_eq!(category_total, 37);
        assert_eq!(status_total, 37);
    }

    #[test]
    fn empty_input_gives_empty_breakdowns() {
        assert!(by_category(&[]).is_empty());
        assert!(by_status(&[]).is_empty());
        assert_eq!(top_category(&[]), None);
    }
}
