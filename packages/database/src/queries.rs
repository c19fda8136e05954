//! Issue CRUD and time-window queries.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use civicsense_issue_models::{Coordinates, Issue, IssueCategory, IssueStatus, NewIssue};
use civicsense_report::{CreatedWindow, WindowEnd};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::{DbError, format_timestamp, parse_timestamp, storage_precision};

/// Default page size for [`list_issues`].
pub const DEFAULT_LIST_LIMIT: u32 = 100;

const ISSUE_COLUMNS: &str = "id, title, description, address, category, severity, status,
    latitude, longitude, contact_email, contact_phone, ai_category, ai_confidence, created_at";

/// Filter and pagination for [`list_issues`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueFilter {
    /// Only issues with this status.
    pub status: Option<IssueStatus>,
    /// Only issues in this category.
    pub category: Option<IssueCategory>,
    /// Maximum rows returned.
    pub limit: u32,
    /// Rows skipped before the first one returned.
    pub offset: u32,
}

impl Default for IssueFilter {
    fn default() -> Self {
        Self {
            status: None,
            category: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

/// Converts an `Option<&str>` to a [`DatabaseValue`], using `Null` for `None`.
fn opt_str(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |s| {
        DatabaseValue::String(s.to_string())
    })
}

/// Converts an `Option<f64>` to a [`DatabaseValue`], using `Null` for `None`.
fn opt_f64(value: Option<f64>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, DatabaseValue::Real64)
}

/// Extracts the `id` column from a `RETURNING id` result.
fn returning_id(rows: &[Row]) -> Result<i64, DbError> {
    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Insert returned no id".to_string(),
    })?;
    row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse issue id: {e}"),
    })
}

/// Appends `created_at` bounds for `window` to `sql`, numbering
/// placeholders from `param_idx`.
fn push_window(
    sql: &mut String,
    params: &mut Vec<DatabaseValue>,
    window: CreatedWindow,
    param_idx: usize,
) {
    let _ = write!(sql, " AND created_at >= ${param_idx}");
    params.push(DatabaseValue::String(format_timestamp(window.start)));

    match window.end {
        WindowEnd::Inclusive(end) => {
            let _ = write!(sql, " AND created_at <= ${}", param_idx + 1);
            params.push(DatabaseValue::String(format_timestamp(end)));
        }
        WindowEnd::Exclusive(end) => {
            let _ = write!(sql, " AND created_at < ${}", param_idx + 1);
            params.push(DatabaseValue::String(format_timestamp(end)));
        }
        WindowEnd::Open => {}
    }
}

fn parse_enum<T: std::str::FromStr>(id: i64, column: &str, value: &str) -> Result<T, DbError> {
    value.parse().map_err(|_| DbError::Corrupt {
        id,
        message: format!("unknown {column} {value:?}"),
    })
}

/// Decodes one `issues` row.
///
/// A row with only one coordinate, or coordinates out of range, decodes
/// with no location rather than failing.
fn issue_from_row(row: &Row) -> Result<Issue, DbError> {
    let id: i64 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse issue id: {e}"),
    })?;

    let category: String = row.to_value("category").unwrap_or_default();
    let severity: String = row.to_value("severity").unwrap_or_default();
    let status: String = row.to_value("status").unwrap_or_default();
    let created_at: String = row.to_value("created_at").unwrap_or_default();

    let latitude: Option<f64> = row.to_value("latitude").unwrap_or(None);
    let longitude: Option<f64> = row.to_value("longitude").unwrap_or(None);
    let location = Coordinates::from_parts(latitude, longitude).unwrap_or_else(|e| {
        log::warn!("Issue {id} has unusable location: {e}");
        None
    });

    let ai_category: Option<String> = row.to_value("ai_category").unwrap_or(None);

    Ok(Issue {
        id,
        title: row.to_value("title").unwrap_or_default(),
        description: row.to_value("description").unwrap_or_default(),
        address: row.to_value("address").unwrap_or(None),
        category: parse_enum(id, "category", &category)?,
        severity: parse_enum(id, "severity", &severity)?,
        status: parse_enum(id, "status", &status)?,
        location,
        contact_email: row.to_value("contact_email").unwrap_or(None),
        contact_phone: row.to_value("contact_phone").unwrap_or(None),
        ai_category: ai_category.and_then(|c| c.parse::<IssueCategory>().ok()),
        ai_confidence: row.to_value("ai_confidence").unwrap_or(None),
        created_at: parse_timestamp(&created_at).map_err(|e| DbError::Corrupt {
            id,
            message: e.to_string(),
        })?,
    })
}

fn issues_from_rows(rows: &[Row]) -> Result<Vec<Issue>, DbError> {
    rows.iter().map(issue_from_row).collect()
}

/// Inserts a new issue with status `pending` and returns it.
///
/// `created_at` is stored with microsecond precision; the returned issue
/// carries the stored value.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub async fn insert_issue(
    db: &dyn Database,
    issue: NewIssue,
    created_at: DateTime<Utc>,
) -> Result<Issue, DbError> {
    let created_at = storage_precision(created_at);

    let rows = db
        .query_raw_params(
            "INSERT INTO issues (title, description, address, category, severity, status,
                                 latitude, longitude, contact_email, contact_phone, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING id",
            &[
                DatabaseValue::String(issue.title.clone()),
                DatabaseValue::String(issue.description.clone()),
                opt_str(issue.address.as_deref()),
                DatabaseValue::String(issue.category.as_ref().to_string()),
                DatabaseValue::String(issue.severity.as_ref().to_string()),
                DatabaseValue::String(IssueStatus::Pending.as_ref().to_string()),
                opt_f64(issue.location.map(|l| l.latitude)),
                opt_f64(issue.location.map(|l| l.longitude)),
                opt_str(issue.contact_email.as_deref()),
                opt_str(issue.contact_phone.as_deref()),
                DatabaseValue::String(format_timestamp(created_at)),
            ],
        )
        .await?;

    let id = returning_id(&rows)?;
    log::debug!("Inserted issue {id} ({})", issue.category);

    Ok(issue.into_issue(id, created_at))
}

/// Fetches one issue by ID.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the row is corrupt.
pub async fn get_issue(db: &dyn Database, id: i64) -> Result<Option<Issue>, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"),
            &[DatabaseValue::Int64(id)],
        )
        .await?;

    rows.first().map(issue_from_row).transpose()
}

/// Lists issues newest first, optionally filtered by status and category.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row is corrupt.
pub async fn list_issues(db: &dyn Database, filter: IssueFilter) -> Result<Vec<Issue>, DbError> {
    let mut sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE 1=1");
    let mut params: Vec<DatabaseValue> = Vec::new();

    if let Some(status) = filter.status {
        params.push(DatabaseValue::String(status.as_ref().to_string()));
        let _ = write!(sql, " AND status = ${}", params.len());
    }

    if let Some(category) = filter.category {
        params.push(DatabaseValue::String(category.as_ref().to_string()));
        let _ = write!(sql, " AND category = ${}", params.len());
    }

    sql.push_str(" ORDER BY created_at DESC, id DESC");

    params.push(DatabaseValue::Int64(i64::from(filter.limit)));
    let _ = write!(sql, " LIMIT ${}", params.len());

    params.push(DatabaseValue::Int64(i64::from(filter.offset)));
    let _ = write!(sql, " OFFSET ${}", params.len());

    let rows = db.query_raw_params(&sql, &params).await?;
    issues_from_rows(&rows)
}

/// Sets the status of an issue and returns the updated issue.
///
/// Returns `None` if no issue has that ID.
///
/// # Errors
///
/// Returns [`DbError`] if the update fails.
pub async fn update_status(
    db: &dyn Database,
    id: i64,
    status: IssueStatus,
) -> Result<Option<Issue>, DbError> {
    let updated = db
        .exec_raw_params(
            "UPDATE issues SET status = $1 WHERE id = $2",
            &[
                DatabaseValue::String(status.as_ref().to_string()),
                DatabaseValue::Int64(id),
            ],
        )
        .await?;

    if updated == 0 {
        return Ok(None);
    }

    log::info!("Issue {id} is now {status}");
    get_issue(db, id).await
}

/// Stores an image classification result on an issue.
///
/// Returns `false` if no issue has that ID.
///
/// # Errors
///
/// Returns [`DbError`] if the update fails.
pub async fn record_classification(
    db: &dyn Database,
    id: i64,
    category: IssueCategory,
    confidence: f64,
) -> Result<bool, DbError> {
    let updated = db
        .exec_raw_params(
            "UPDATE issues SET ai_category = $1, ai_confidence = $2 WHERE id = $3",
            &[
                DatabaseValue::String(category.as_ref().to_string()),
                DatabaseValue::Real64(confidence),
                DatabaseValue::Int64(id),
            ],
        )
        .await?;

    Ok(updated > 0)
}

/// Deletes an issue. Returns `false` if no issue has that ID.
///
/// # Errors
///
/// Returns [`DbError`] if the delete fails.
pub async fn delete_issue(db: &dyn Database, id: i64) -> Result<bool, DbError> {
    let deleted = db
        .exec_raw_params(
            "DELETE FROM issues WHERE id = $1",
            &[DatabaseValue::Int64(id)],
        )
        .await?;

    Ok(deleted > 0)
}

/// Every issue created inside `window`, oldest first, ties by ID.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row is corrupt.
pub async fn issues_in_window(
    db: &dyn Database,
    window: CreatedWindow,
) -> Result<Vec<Issue>, DbError> {
    let mut sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE 1=1");
    let mut params = Vec::with_capacity(2);
    push_window(&mut sql, &mut params, window, 1);
    sql.push_str(" ORDER BY created_at ASC, id ASC");

    let rows = db.query_raw_params(&sql, &params).await?;
    issues_from_rows(&rows)
}

/// Number of issues created inside `window`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn count_in_window(db: &dyn Database, window: CreatedWindow) -> Result<u64, DbError> {
    let mut sql = "SELECT COUNT(*) as cnt FROM issues WHERE 1=1".to_string();
    let mut params = Vec::with_capacity(2);
    push_window(&mut sql, &mut params, window, 1);

    let rows = db.query_raw_params(&sql, &params).await?;
    let count: i64 = rows.first().map_or(0, |r| r.to_value("cnt").unwrap_or(0));

    u64::try_from(count).map_err(|e| DbError::Conversion {
        message: format!("Negative count {count}: {e}"),
    })
}
