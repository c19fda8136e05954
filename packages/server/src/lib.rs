#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for civicsense.
//!
//! Serves the REST API for submitting and triaging civic issues, analyzing
//! issue photos, and fetching the weekly city health report. Issues are
//! stored in `SQLite`; reports are computed on demand from the same store.

pub mod config;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, error, middleware, web};
use civicsense_classifier::{HttpClassifier, ImageClassifier};
use civicsense_database::DatabaseIssueSource;
use civicsense_report::ReportGenerator;
use switchy_database::Database;
use thiserror::Error;

pub use config::ServerConfig;

/// Largest accepted photo upload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The issue store could not be opened.
    #[error(transparent)]
    Database(#[from] civicsense_database::DbError),

    /// The image classifier could not be built.
    #[error(transparent)]
    Classifier(#[from] civicsense_classifier::ClassifierError),

    /// Binding or serving failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// `SQLite` issue store.
    pub db: Arc<dyn Database>,
    /// Weekly report generator reading from [`Self::db`].
    pub reports: ReportGenerator,
    /// Image classifier, if one is configured.
    pub classifier: Option<Arc<dyn ImageClassifier>>,
}

impl AppState {
    /// Builds the state around an open issue store.
    #[must_use]
    pub fn new(db: Arc<dyn Database>, classifier: Option<Arc<dyn ImageClassifier>>) -> Self {
        let reports = ReportGenerator::new(Arc::new(DatabaseIssueSource::new(db.clone())));
        Self {
            db,
            reports,
            classifier,
        }
    }
}

fn json_error(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
}

/// Registers the `/api` routes and extractor error handlers.
///
/// Malformed JSON bodies and query strings are answered with
/// `400 {"error": ...}` like every other validation failure.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let response = json_error(err.to_string());
        error::InternalError::from_response(err, response).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let response = json_error(err.to_string());
        error::InternalError::from_response(err, response).into()
    }))
    .app_data(web::PayloadConfig::new(MAX_IMAGE_BYTES))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/categories", web::get().to(handlers::categories))
            .route("/issues", web::get().to(handlers::list_issues))
            .route("/issues", web::post().to(handlers::create_issue))
            .route(
                "/issues/weekly_report",
                web::get().to(handlers::weekly_report),
            )
            .route("/issues/{id}", web::get().to(handlers::get_issue))
            .route("/issues/{id}", web::delete().to(handlers::delete_issue))
            .route(
                "/issues/{id}/status",
                web::patch().to(handlers::update_status),
            )
            .route("/issues/{id}/photo", web::post().to(handlers::upload_photo))
            .route("/ai/analyze", web::post().to(handlers::analyze_image)),
    );
}

/// Starts the civicsense API server.
///
/// Opens the issue store, builds the image classifier if one is
/// configured, and serves until shut down. Logging must already be
/// initialized by the caller.
///
/// # Errors
///
/// Returns [`ServerError`] if the store cannot be opened, the classifier
/// configuration is invalid, or the HTTP server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    log::info!("Opening issue store at {}...", config.db_path.display());
    let db = civicsense_database::open_db(&config.db_path).await?;

    let classifier: Option<Arc<dyn ImageClassifier>> = match config.classifier {
        Some(classifier_config) => {
            log::info!("Image classifier endpoint: {}", classifier_config.url);
            Some(Arc::new(HttpClassifier::new(classifier_config)?))
        }
        None => {
            log::warn!("CLASSIFIER_URL not set; photo analysis is unavailable");
            None
        }
    };

    let state = web::Data::new(AppState::new(Arc::from(db), classifier));

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await?;

    Ok(())
}
