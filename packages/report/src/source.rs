//! The issue store boundary consumed by the report generator.
//!
//! The generator only needs two things from a store: every issue created
//! inside a time window, and how many issues were created inside a time
//! window. Anything that can answer those (a database, an in-memory
//! vector, a remote API) can back a report.

use chrono::{DateTime, Utc};
use civicsense_issue_models::Issue;
use thiserror::Error;

/// Errors an [`IssueSource`] can report.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The store could not be reached or the query failed.
    #[error("Issue store unavailable: {message}")]
    Unavailable {
        /// Description of what went wrong.
        message: String,
    },

    /// The store returned a row that does not decode to an [`Issue`].
    #[error("Corrupt issue record {id}: {message}")]
    Corrupt {
        /// Identifier of the offending row.
        id: i64,
        /// Description of what went wrong.
        message: String,
    },
}

/// Upper bound of a [`CreatedWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    /// `created_at <= t`
    Inclusive(DateTime<Utc>),
    /// `created_at < t`
    Exclusive(DateTime<Utc>),
    /// No upper bound.
    Open,
}

/// A filter on issue creation time. The start is always inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedWindow {
    /// Earliest matching `created_at` (inclusive).
    pub start: DateTime<Utc>,
    /// Upper bound.
    pub end: WindowEnd,
}

impl CreatedWindow {
    /// `[start, end]`
    #[must_use]
    pub const fn closed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: WindowEnd::Inclusive(end),
        }
    }

    /// `[start, end)`
    #[must_use]
    pub const fn half_open(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: WindowEnd::Exclusive(end),
        }
    }

    /// `[start, ∞)`
    #[must_use]
    pub const fn since(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: WindowEnd::Open,
        }
    }

    /// Whether an issue created at `created_at` falls inside the window.
    #[must_use]
    pub fn contains(&self, created_at: DateTime<Utc>) -> bool {
        if created_at < self.start {
            return false;
        }
        match self.end {
            WindowEnd::Inclusive(end) => created_at <= end,
            WindowEnd::Exclusive(end) => created_at < end,
            WindowEnd::Open => true,
        }
    }
}

/// Read access to the issue store.
#[async_trait::async_trait]
pub trait IssueSource: Send + Sync {
    /// Returns every issue created inside `window`, oldest first (ties
    /// broken by ID).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the store cannot answer the query.
    async fn fetch(&self, window: CreatedWindow) -> Result<Vec<Issue>, SourceError>;

    /// Counts the issues created inside `window`.
    ///
    /// The default implementation counts the result of [`Self::fetch`];
    /// stores with a cheaper count query should override it.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the store cannot answer the query.
    async fn count(&self, window: CreatedWindow) -> Result<u64, SourceError> {
        Ok(self.fetch(window).await?.len() as u64)
    }
}
