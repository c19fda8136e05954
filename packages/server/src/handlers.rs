//! HTTP handler functions for the civicsense API.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use civicsense_classifier::{
    ClassificationOutcome, ImageQuality, analyze_image_quality, classify_or_unavailable,
    classify_text,
};
use civicsense_database::queries::{self, IssueFilter};
use civicsense_issue_models::IssueCategory;
use civicsense_server_models::{
    ApiCategory, ApiHealth, ApiImageAnalysis, ApiIssue, ApiPhotoAnalysis, CreateIssueRequest,
    IssueListParams,
    ReportParams, UpdateStatusRequest,
};

use crate::AppState;

fn bad_request(message: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message.to_string() }))
}

fn not_found(id: i64) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": format!("Issue {id} not found")
    }))
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> HttpResponse {
    log::error!("{context}: {e}");
    HttpResponse::InternalServerError().json(serde_json::json!({ "error": context }))
}

/// Runs the CPU-bound quality checks off the async workers.
async fn image_quality(body: &web::Bytes) -> Result<ImageQuality, actix_web::error::BlockingError> {
    let bytes = body.clone();
    web::block(move || analyze_image_quality(&bytes)).await
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/categories`
///
/// Returns every issue category with its display name and suggested
/// action.
pub async fn categories() -> HttpResponse {
    let categories: Vec<ApiCategory> = IssueCategory::all()
        .iter()
        .copied()
        .map(ApiCategory::from)
        .collect();

    HttpResponse::Ok().json(categories)
}

/// `GET /api/issues`
///
/// Lists issues newest first with optional status and category filters.
pub async fn list_issues(
    state: web::Data<AppState>,
    params: web::Query<IssueListParams>,
) -> HttpResponse {
    let defaults = IssueFilter::default();
    let filter = IssueFilter {
        status: params.status,
        category: params.category,
        limit: params.limit.unwrap_or(defaults.limit),
        offset: params.offset.unwrap_or(defaults.offset),
    };

    match queries::list_issues(state.db.as_ref(), filter).await {
        Ok(issues) => {
            let issues: Vec<ApiIssue> = issues.into_iter().map(ApiIssue::from).collect();
            HttpResponse::Ok().json(issues)
        }
        Err(e) => internal_error("Failed to list issues", e),
    }
}

/// `POST /api/issues`
///
/// Creates an issue. A missing category is inferred from the text.
pub async fn create_issue(
    state: web::Data<AppState>,
    body: web::Json<CreateIssueRequest>,
) -> HttpResponse {
    let new_issue = match body.into_inner().into_new_issue(classify_text) {
        Ok(issue) => issue,
        Err(e) => return bad_request(e),
    };

    match queries::insert_issue(state.db.as_ref(), new_issue, Utc::now()).await {
        Ok(issue) => {
            log::info!("Created issue {} ({})", issue.id, issue.category);
            HttpResponse::Created().json(ApiIssue::from(issue))
        }
        Err(e) => internal_error("Failed to create issue", e),
    }
}

/// `GET /api/issues/{id}`
pub async fn get_issue(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();
    match queries::get_issue(state.db.as_ref(), id).await {
        Ok(Some(issue)) => HttpResponse::Ok().json(ApiIssue::from(issue)),
        Ok(None) => not_found(id),
        Err(e) => internal_error("Failed to load issue", e),
    }
}

/// `PATCH /api/issues/{id}/status`
pub async fn update_status(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateStatusRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    match queries::update_status(state.db.as_ref(), id, body.status).await {
        Ok(Some(issue)) => HttpResponse::Ok().json(ApiIssue::from(issue)),
        Ok(None) => not_found(id),
        Err(e) => internal_error("Failed to update issue status", e),
    }
}

/// `DELETE /api/issues/{id}`
pub async fn delete_issue(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();
    match queries::delete_issue(state.db.as_ref(), id).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found(id),
        Err(e) => internal_error("Failed to delete issue", e),
    }
}

/// `POST /api/issues/{id}/photo`
///
/// Classifies the uploaded photo and stores the result on the issue. The
/// upload succeeds even when classification is unavailable.
pub async fn upload_photo(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Bytes,
) -> HttpResponse {
    let id = path.into_inner();

    match queries::get_issue(state.db.as_ref(), id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(id),
        Err(e) => return internal_error("Failed to load issue", e),
    }

    let image_quality = match image_quality(&body).await {
        Ok(quality) => quality,
        Err(e) => return internal_error("Failed to check image quality", e),
    };
    let analysis = classify_or_unavailable(state.classifier.as_deref(), &body).await;

    if let ClassificationOutcome::Classified(classification) = &analysis
        && let Err(e) = queries::record_classification(
            state.db.as_ref(),
            id,
            classification.category,
            classification.confidence,
        )
        .await
    {
        return internal_error("Failed to store classification", e);
    }

    match queries::get_issue(state.db.as_ref(), id).await {
        Ok(Some(issue)) => HttpResponse::Ok().json(ApiPhotoAnalysis {
            issue: ApiIssue::from(issue),
            analysis,
            image_quality,
        }),
        Ok(None) => not_found(id),
        Err(e) => internal_error("Failed to load issue", e),
    }
}

/// `POST /api/ai/analyze`
///
/// Classifies an image and checks its quality without storing anything.
pub async fn analyze_image(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let quality = match image_quality(&body).await {
        Ok(quality) => quality,
        Err(e) => return internal_error("Failed to check image quality", e),
    };
    let analysis = classify_or_unavailable(state.classifier.as_deref(), &body).await;

    HttpResponse::Ok().json(ApiImageAnalysis::new(analysis, quality))
}

/// `GET /api/issues/weekly_report`
///
/// Computes the city health report for the seven days ending now, or
/// ending at `?at=` when given.
pub async fn weekly_report(
    state: web::Data<AppState>,
    params: web::Query<ReportParams>,
) -> HttpResponse {
    let now = params.at.unwrap_or_else(Utc::now);

    match state.reports.generate_weekly_report_at(now).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => internal_error("Failed to generate weekly report", e),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};
    use chrono::{DateTime, TimeDelta};
    use civicsense_classifier::{
        Classification, ClassifierError, ImageClassifier, LabelSet, QualityIssue,
    };
    use civicsense_issue_models::{IssueStatus, NewIssue};
    use civicsense_report_models::Report;
    use switchy_database::Database;

    use super::*;
    use crate::configure;

    struct TempDb {
        db: Arc<dyn Database>,
        path: PathBuf,
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    async fn temp_db() -> TempDb {
        let path =
            std::env::temp_dir().join(format!("civicsense_test_{}.db", uuid::Uuid::new_v4()));
        let db = civicsense_database::open_db(&path).await.unwrap();
        TempDb {
            db: Arc::from(db),
            path,
        }
    }

    struct PotholeClassifier;

    #[async_trait::async_trait]
    impl ImageClassifier for PotholeClassifier {
        async fn classify(&self, image: &[u8]) -> Result<Classification, ClassifierError> {
            if image.is_empty() {
                return Err(ClassifierError::EmptyImage);
            }
            let labels = LabelSet::default();
            let mut scores = vec![0.01; labels.len()];
            scores[0] = 0.91;
            Classification::from_scores(&labels, &scores)
        }
    }

    fn state(t: &TempDb, classifier: Option<Arc<dyn ImageClassifier>>) -> web::Data<AppState> {
        web::Data::new(AppState::new(t.db.clone(), classifier))
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let t = temp_db().await;
        let app = app!(state(&t, None));
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn categories_lists_all() {
        let t = temp_db().await;
        let app = app!(state(&t, None));
        let req = test::TestRequest::get().uri("/api/categories").to_request();
        let body: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.len(), IssueCategory::all().len());
        assert_eq!(body[0]["name"], "road_damage");
        assert_eq!(body[0]["display_name"], "Road Damage");
    }

    #[actix_web::test]
    async fn create_infers_category_and_get_returns_it() {
        let t = temp_db().await;
        let app = app!(state(&t, None));

        let req = test::TestRequest::post()
            .uri("/api/issues")
            .set_json(serde_json::json!({
                "title": "Broken pipe on 3rd Ave",
                "description": "Water running down the street",
                "latitude": 12.97,
                "longitude": 77.59,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: ApiIssue = test::read_body_json(resp).await;
        assert_eq!(created.category, IssueCategory::WaterLeak);
        assert_eq!(created.status, IssueStatus::Pending);
        assert_eq!(created.latitude, Some(12.97));

        let req = test::TestRequest::get()
            .uri(&format!("/api/issues/{}", created.id))
            .to_request();
        let fetched: ApiIssue = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched, created);
    }

    #[actix_web::test]
    async fn invalid_create_requests_are_400() {
        let t = temp_db().await;
        let app = app!(state(&t, None));

        for body in [
            serde_json::json!({ "title": "" }),
            serde_json::json!({ "title": "x", "latitude": 12.0 }),
            serde_json::json!({ "title": "x", "latitude": 120.0, "longitude": 0.0 }),
            serde_json::json!({ "title": "x", "category": "volcano" }),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/issues")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert!(body["error"].is_string());
        }
    }

    #[actix_web::test]
    async fn status_update_delete_and_missing_ids() {
        let t = temp_db().await;
        let issue = queries::insert_issue(
            t.db.as_ref(),
            NewIssue::new("dark street", IssueCategory::StreetLight),
            Utc::now(),
        )
        .await
        .unwrap();
        let app = app!(state(&t, None));

        let req = test::TestRequest::patch()
            .uri(&format!("/api/issues/{}/status", issue.id))
            .set_json(serde_json::json!({ "status": "resolved" }))
            .to_request();
        let updated: ApiIssue = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated.status, IssueStatus::Resolved);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/issues/{}/status", issue.id))
            .set_json(serde_json::json!({ "status": "closed" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::delete()
            .uri(&format!("/api/issues/{}", issue.id))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NO_CONTENT
        );

        for req in [
            test::TestRequest::get().uri(&format!("/api/issues/{}", issue.id)),
            test::TestRequest::delete().uri(&format!("/api/issues/{}", issue.id)),
            test::TestRequest::patch()
                .uri(&format!("/api/issues/{}/status", issue.id))
                .set_json(serde_json::json!({ "status": "pending" })),
        ] {
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
    }

    #[actix_web::test]
    async fn list_filters_by_status() {
        let t = temp_db().await;
        let now = Utc::now();
        for (n, title) in ["a", "b", "c"].iter().enumerate() {
            queries::insert_issue(
                t.db.as_ref(),
                NewIssue::new(*title, IssueCategory::Garbage),
                now - TimeDelta::minutes(i64::try_from(n).unwrap()),
            )
            .await
            .unwrap();
        }
        queries::update_status(t.db.as_ref(), 2, IssueStatus::InProgress)
            .await
            .unwrap();
        let app = app!(state(&t, None));

        let req = test::TestRequest::get().uri("/api/issues").to_request();
        let all: Vec<ApiIssue> = test::call_and_read_body_json(&app, req).await;
        let titles: Vec<&str> = all.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);

        let req = test::TestRequest::get()
            .uri("/api/issues?status=in_progress")
            .to_request();
        let filtered: Vec<ApiIssue> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "b");

        let req = test::TestRequest::get()
            .uri("/api/issues?status=lost")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_web::test]
    async fn photo_without_classifier_is_unavailable() {
        let t = temp_db().await;
        let issue = queries::insert_issue(
            t.db.as_ref(),
            NewIssue::new("something", IssueCategory::Other),
            Utc::now(),
        )
        .await
        .unwrap();
        let app = app!(state(&t, None));

        let req = test::TestRequest::post()
            .uri(&format!("/api/issues/{}/photo", issue.id))
            .set_payload(vec![0xFF, 0xD8, 0xFF])
            .to_request();
        let body: ApiPhotoAnalysis = test::call_and_read_body_json(&app, req).await;
        assert!(matches!(
            body.analysis,
            ClassificationOutcome::Unavailable { .. }
        ));
        assert_eq!(body.issue.ai_category, None);
        assert_eq!(body.image_quality.issues, vec![QualityIssue::Unreadable]);
        assert!(!body.image_quality.is_good);
    }

    #[actix_web::test]
    async fn photo_classification_is_stored() {
        let t = temp_db().await;
        let issue = queries::insert_issue(
            t.db.as_ref(),
            NewIssue::new("something", IssueCategory::Other),
            Utc::now(),
        )
        .await
        .unwrap();
        let app = app!(state(&t, Some(Arc::new(PotholeClassifier))));

        let req = test::TestRequest::post()
            .uri(&format!("/api/issues/{}/photo", issue.id))
            .set_payload(vec![0xFF, 0xD8, 0xFF])
            .to_request();
        let body: ApiPhotoAnalysis = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.issue.ai_category, Some(IssueCategory::RoadDamage));
        assert_eq!(body.issue.category, IssueCategory::Other);
        assert!((body.issue.ai_confidence.unwrap() - 0.91).abs() < 1e-9);

        let req = test::TestRequest::post()
            .uri("/api/issues/9999/photo")
            .set_payload(vec![1, 2, 3])
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn analyze_reports_failures_as_unavailable() {
        let t = temp_db().await;
        let app = app!(state(&t, Some(Arc::new(PotholeClassifier))));

        let req = test::TestRequest::post()
            .uri("/api/ai/analyze")
            .set_payload(Vec::<u8>::new())
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "unavailable");
        assert_eq!(body["image_quality_issues"], serde_json::json!(["unreadable"]));
        assert_eq!(body["image_quality_score"], 0.0);

        let req = test::TestRequest::post()
            .uri("/api/ai/analyze")
            .set_payload(vec![1, 2, 3])
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "classified");
        assert_eq!(body["category"], "road_damage");
        assert_eq!(body["detected_label"], "pothole");
    }

    #[actix_web::test]
    async fn analyze_checks_quality_of_decodable_images() {
        let t = temp_db().await;
        let app = app!(state(&t, Some(Arc::new(PotholeClassifier))));

        let sharp = image::DynamicImage::ImageLuma8(image::GrayImage::from_fn(320, 320, |x, y| {
            image::Luma([if (x + y) % 2 == 0 { 0 } else { 255 }])
        }));
        let mut png = Vec::new();
        sharp
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let req = test::TestRequest::post()
            .uri("/api/ai/analyze")
            .set_payload(png)
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "classified");
        assert_eq!(body["image_quality_good"], true);
        assert_eq!(body["image_quality_score"], 1.0);
        assert_eq!(body["image_quality_issues"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn weekly_report_honors_at() {
        let t = temp_db().await;
        let at: DateTime<Utc> = "2024-03-10T12:00:00Z".parse().unwrap();
        for days_ago in [1, 2, 20] {
            queries::insert_issue(
                t.db.as_ref(),
                NewIssue::new("pothole", IssueCategory::RoadDamage),
                at - TimeDelta::days(days_ago),
            )
            .await
            .unwrap();
        }
        let app = app!(state(&t, None));

        let req = test::TestRequest::get()
            .uri("/api/issues/weekly_report?at=2024-03-10T12:00:00Z")
            .to_request();
        let report: Report = test::call_and_read_body_json(&app, req).await;
        assert_eq!(report.generated_at, at);
        assert_eq!(report.summary.total_issues, 2);
        assert_eq!(report.period.days, 7);
        assert!((report.summary.health_score - 0.0).abs() < f64::EPSILON);
        assert_eq!(
            report.recommendations[1],
            "Schedule road maintenance survey in affected areas"
        );

        let req = test::TestRequest::get()
            .uri("/api/issues/weekly_report?at=tuesday")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
    }
}
