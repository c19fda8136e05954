#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `SQLite` issue store.
//!
//! Issues live in a single `issues` table. Enum columns hold the
//! `snake_case` names from `civicsense_issue_models`. Timestamps are stored
//! as fixed-width RFC 3339 UTC strings with microsecond precision, so
//! lexical order is chronological order and time windows are plain string
//! comparisons.
//!
//! Uses `switchy_database` for all database operations.

pub mod queries;
pub mod source;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;
use thiserror::Error;

pub use source::DatabaseIssueSource;

/// Default path for the issues database.
pub const DEFAULT_DB_PATH: &str = "data/civicsense.db";

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// The database file could not be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row does not decode to an issue.
    #[error("Corrupt issue record {id}: {message}")]
    Corrupt {
        /// Row ID.
        id: i64,
        /// Description of what went wrong.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Opens (or creates) the issues `SQLite` database and ensures the schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the parent directory cannot be created, the
/// database cannot be opened, or schema creation fails.
pub async fn open_db(path: &Path) -> Result<Box<dyn Database>, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Connection(e.to_string()))?;

    ensure_schema(db.as_ref()).await?;

    log::debug!("Opened issue store at {}", path.display());

    Ok(db)
}

/// Creates the `issues` table and its indexes if they don't already exist.
async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS issues (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            title           TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            address         TEXT,
            category        TEXT NOT NULL,
            severity        TEXT NOT NULL,
            status          TEXT NOT NULL,
            latitude        REAL,
            longitude       REAL,
            contact_email   TEXT,
            contact_phone   TEXT,
            ai_category     TEXT,
            ai_confidence   REAL,
            created_at      TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_issues_created_at ON issues (created_at)")
        .await?;

    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_issues_status ON issues (status)")
        .await?;

    Ok(())
}

/// Formats a timestamp the way it is stored: RFC 3339, UTC, microseconds,
/// `Z` suffix.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp.
///
/// # Errors
///
/// Returns [`DbError::Conversion`] if `value` is not RFC 3339.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Conversion {
            message: format!("Invalid timestamp {value:?}: {e}"),
        })
}

/// Drops sub-microsecond precision so a value survives a store round trip.
#[must_use]
pub fn storage_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}
