#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line interface for civicsense.
//!
//! ```text
//! civicsense report [--at 2024-03-10T12:00:00Z] [--compact]
//! civicsense issues list [--status pending] [--category garbage] [--limit 20]
//! civicsense issues add --title "Pothole" [--category road_damage] [--lat 12.97 --lng 77.59]
//! civicsense issues set-status <id> <status>
//! civicsense serve
//! ```
//!
//! Every command works against the `SQLite` store given by `--db`, then
//! `CIVICSENSE_DB_PATH`, then `data/civicsense.db`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use civicsense_database::{DEFAULT_DB_PATH, DatabaseIssueSource, open_db, queries};
use civicsense_issue_models::{Coordinates, IssueCategory, IssueSeverity, IssueStatus, NewIssue};
use civicsense_report::ReportGenerator;
use civicsense_server::ServerConfig;
use clap::{Parser, Subcommand};
use switchy_database::Database;

#[derive(Parser)]
#[command(name = "civicsense", about = "Civic issue tracking and weekly city health reports")]
struct Cli {
    /// Path to the `SQLite` issue store
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the weekly city health report as JSON
    Report {
        /// Compute the report as of this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// Print compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
    /// Manage issues
    Issues {
        #[command(subcommand)]
        command: IssuesCommand,
    },
    /// Start the REST API server
    Serve,
}

#[derive(Subcommand)]
enum IssuesCommand {
    /// List issues, newest first
    List {
        /// Only issues with this status
        #[arg(long)]
        status: Option<IssueStatus>,
        /// Only issues in this category
        #[arg(long)]
        category: Option<IssueCategory>,
        /// Maximum number of issues to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Report a new issue
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Inferred from the title and description when omitted
        #[arg(long)]
        category: Option<IssueCategory>,
        #[arg(long, default_value = "medium")]
        severity: IssueSeverity,
        #[arg(long)]
        address: Option<String>,
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },
    /// Change an issue's status
    SetStatus {
        id: i64,
        status: IssueStatus,
    },
}

/// `--db`, then `CIVICSENSE_DB_PATH`, then the default.
fn resolve_db_path(flag: Option<PathBuf>, env: Option<String>) -> PathBuf {
    flag.or_else(|| env.filter(|p| !p.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db, std::env::var("CIVICSENSE_DB_PATH").ok());
    log::debug!("Using issue store at {}", db_path.display());

    match cli.command {
        Commands::Serve => {
            let mut config = ServerConfig::from_env()?;
            config.db_path = db_path;

            // actix-web drives its own System; keep it off the tokio workers.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new()
                    .block_on(civicsense_server::run_server(config))
                    .map_err(|e| e.to_string())
            })
            .await??;
        }
        Commands::Report { at, compact } => {
            let db = open_db(&db_path).await?;
            let generator = ReportGenerator::new(Arc::new(DatabaseIssueSource::new(Arc::from(db))));
            let report = generator
                .generate_weekly_report_at(at.unwrap_or_else(Utc::now))
                .await?;

            let json = if compact {
                serde_json::to_string(&report)?
            } else {
                serde_json::to_string_pretty(&report)?
            };
            println!("{json}");
        }
        Commands::Issues { command } => {
            let db = open_db(&db_path).await?;
            run_issues(db.as_ref(), command).await?;
        }
    }

    Ok(())
}

async fn run_issues(
    db: &dyn Database,
    command: IssuesCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        IssuesCommand::List {
            status,
            category,
            limit,
        } => {
            let issues = queries::list_issues(
                db,
                queries::IssueFilter {
                    status,
                    category,
                    limit,
                    offset: 0,
                },
            )
            .await?;

            if issues.is_empty() {
                println!("No issues found.");
                return Ok(());
            }

            println!(
                "{:<6} {:<12} {:<16} {:<20} TITLE",
                "ID", "STATUS", "CATEGORY", "CREATED"
            );
            println!("{}", "-".repeat(90));

            for issue in &issues {
                println!(
                    "{:<6} {:<12} {:<16} {:<20} {}",
                    issue.id,
                    issue.status,
                    issue.category,
                    issue.created_at.format("%Y-%m-%d %H:%M"),
                    truncate(&issue.title, 40)
                );
            }

            println!("\n{} issue(s)", issues.len());
        }
        IssuesCommand::Add {
            title,
            description,
            category,
            severity,
            address,
            lat,
            lng,
        } => {
            let category = category
                .unwrap_or_else(|| civicsense_classifier::classify_text(&title, &description));
            let location = Coordinates::from_parts(lat, lng)?;

            let mut new_issue = NewIssue::new(title, category);
            new_issue.description = description;
            new_issue.severity = severity;
            new_issue.address = address;
            new_issue.location = location;

            let issue = queries::insert_issue(db, new_issue, Utc::now()).await?;
            println!("Created issue {} ({})", issue.id, issue.category);
        }
        IssuesCommand::SetStatus { id, status } => {
            if let Some(issue) = queries::update_status(db, id, status).await? {
                println!("Issue {} is now {}", issue.id, issue.status);
            } else {
                eprintln!("Issue not found: {id}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn db_path_precedence() {
        assert_eq!(
            resolve_db_path(Some("a.db".into()), Some("b.db".to_string())),
            PathBuf::from("a.db")
        );
        assert_eq!(
            resolve_db_path(None, Some("b.db".to_string())),
            PathBuf::from("b.db")
        );
        assert_eq!(
            resolve_db_path(None, Some(String::new())),
            PathBuf::from(DEFAULT_DB_PATH)
        );
        assert_eq!(resolve_db_path(None, None), PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn parses_report_at() {
        let cli = Cli::try_parse_from([
            "civicsense",
            "report",
            "--at",
            "2024-03-10T12:00:00Z",
            "--compact",
        ])
        .unwrap();
        let Commands::Report { at, compact } = cli.command else {
            panic!("expected report command");
        };
        assert!(compact);
        assert_eq!(at, Some("2024-03-10T12:00:00Z".parse().unwrap()));
    }

    #[test]
    fn parses_issue_enums_and_aliases() {
        let cli = Cli::try_parse_from([
            "civicsense",
            "--db",
            "x.db",
            "issues",
            "add",
            "--title",
            "Sparking pole",
            "--category",
            "electrical",
            "--lat",
            "-33.86",
            "--lng",
            "151.2",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
        let Commands::Issues {
            command: IssuesCommand::Add {
                category, lat, severity, ..
            },
        } = cli.command
        else {
            panic!("expected issues add");
        };
        assert_eq!(category, Some(IssueCategory::StreetLight));
        assert_eq!(lat, Some(-33.86));
        assert_eq!(severity, IssueSeverity::Medium);
    }

    #[test]
    fn lat_without_lng_is_rejected() {
        assert!(
            Cli::try_parse_from(["civicsense", "issues", "add", "--title", "x", "--lat", "1.0"])
                .is_err()
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(Cli::try_parse_from(["civicsense", "issues", "set-status", "3", "closed"]).is_err());
        assert!(
            Cli::try_parse_from(["civicsense", "issues", "set-status", "3", "in_progress"]).is_ok()
        );
    }

    #[test]
    fn long_titles_are_truncated() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long title indeed", 10), "a very ...");
    }
}
