//! A vector-backed [`IssueSource`].
//!
//! Used as a substitutable fake in tests and for small in-process setups.
//! Issues can be inserted and have their status changed in place.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use civicsense_issue_models::{Issue, IssueStatus, NewIssue};

use crate::source::{CreatedWindow, IssueSource, SourceError};

/// In-memory issue store.
#[derive(Debug)]
pub struct InMemoryIssueSource {
    issues: RwLock<Vec<Issue>>,
    next_id: AtomicI64,
}

impl Default for InMemoryIssueSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIssueSource {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            issues: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Creates a store pre-populated with `issues`. New IDs continue after
    /// the largest existing one.
    #[must_use]
    pub fn with_issues(issues: Vec<Issue>) -> Self {
        let next = issues.iter().map(|i| i.id).max().unwrap_or(0) + 1;
        Self {
            issues: RwLock::new(issues),
            next_id: AtomicI64::new(next),
        }
    }

    /// Stores a new submission and returns the stored issue.
    pub fn insert(&self, new_issue: NewIssue, created_at: DateTime<Utc>) -> Issue {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let issue = new_issue.into_issue(id, created_at);
        self.issues
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(issue.clone());
        issue
    }

    /// Updates an issue's status. Returns `false` if no issue has `id`.
    pub fn set_status(&self, id: i64, status: IssueStatus) -> bool {
        let mut issues = self.issues.write().unwrap_or_else(PoisonError::into_inner);
        issues.iter_mut().find(|i| i.id == id).is_some_and(|issue| {
            issue.status = status;
            true
        })
    }

    /// Number of stored issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no issues.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matching(&self, window: CreatedWindow) -> Vec<Issue> {
        let issues = self.issues.read().unwrap_or_else(PoisonError::into_inner);
        let mut matched: Vec<Issue> = issues
            .iter()
            .filter(|i| window.contains(i.created_at))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        matched
    }
}

#[async_trait::async_trait]
impl IssueSource for InMemoryIssueSource {
    async fn fetch(&self, window: CreatedWindow) -> Result<Vec<Issue>, SourceError> {
        Ok(self.matching(window))
    }

    async fn count(&self, window: CreatedWindow) -> Result<u64, SourceError> {
        let issues = self.issues.read().unwrap_or_else(PoisonError::into_inner);
        Ok(issues
            .iter()
            .filter(|i| window.contains(i.created_at))
            .count() as u64)
    }
}
