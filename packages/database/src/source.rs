//! [`IssueSource`] over the `SQLite` store.

use std::sync::Arc;

use civicsense_issue_models::Issue;
use civicsense_report::{CreatedWindow, IssueSource, SourceError};
use switchy_database::Database;

use crate::{DbError, queries};

impl From<DbError> for SourceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Corrupt { id, message } => Self::Corrupt { id, message },
            other => Self::Unavailable {
                message: other.to_string(),
            },
        }
    }
}

/// Feeds the report generator from the issues table.
#[derive(Clone)]
pub struct DatabaseIssueSource {
    db: Arc<dyn Database>,
}

impl DatabaseIssueSource {
    /// Wraps an open issue store.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl IssueSource for DatabaseIssueSource {
    async fn fetch(&self, window: CreatedWindow) -> Result<Vec<Issue>, SourceError> {
        Ok(queries::issues_in_window(self.db.as_ref(), window).await?)
    }

    async fn count(&self, window: CreatedWindow) -> Result<u64, SourceError> {
        Ok(queries::count_in_window(self.db.as_ref(), window).await?)
    }
}
