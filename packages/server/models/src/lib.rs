#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the civicsense server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the store types so the API contract can evolve independently; for
//! example an issue's location is flattened to `latitude`/`longitude` on
//! the wire.

use chrono::{DateTime, Utc};
use civicsense_classifier::{ClassificationOutcome, ImageQuality, QualityIssue};
use civicsense_issue_models::{
    Coordinates, CoordinatesError, Issue, IssueCategory, IssueSeverity, IssueStatus, NewIssue,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// One entry in the category listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCategory {
    /// Wire name, e.g. `road_damage`.
    pub name: IssueCategory,
    /// Title-case name, e.g. `Road Damage`.
    pub display_name: String,
    /// Suggested action when this category dominates a report.
    pub recommendation: Option<String>,
}

impl From<IssueCategory> for ApiCategory {
    fn from(category: IssueCategory) -> Self {
        Self {
            name: category,
            display_name: category.display_name().to_string(),
            recommendation: category.recommendation().map(str::to_string),
        }
    }
}

/// An issue as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiIssue {
    /// Store-assigned identifier.
    pub id: i64,
    /// Short summary.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Free-text address or landmark.
    pub address: Option<String>,
    /// Reported category.
    pub category: IssueCategory,
    /// Reporter-assessed urgency.
    pub severity: IssueSeverity,
    /// Handling status.
    pub status: IssueStatus,
    /// Latitude, present together with [`Self::longitude`].
    pub latitude: Option<f64>,
    /// Longitude, present together with [`Self::latitude`].
    pub longitude: Option<f64>,
    /// Contact email for follow-up.
    pub contact_email: Option<String>,
    /// Contact phone for follow-up.
    pub contact_phone: Option<String>,
    /// Category suggested by the image classifier.
    pub ai_category: Option<IssueCategory>,
    /// Classifier confidence for [`Self::ai_category`].
    pub ai_confidence: Option<f64>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

impl From<Issue> for ApiIssue {
    fn from(issue: Issue) -> Self {
        Self {
            id: issue.id,
            title: issue.title,
            description: issue.description,
            address: issue.address,
            category: issue.category,
            severity: issue.severity,
            status: issue.status,
            latitude: issue.location.map(|l| l.latitude),
            longitude: issue.location.map(|l| l.longitude),
            contact_email: issue.contact_email,
            contact_phone: issue.contact_phone,
            ai_category: issue.ai_category,
            ai_confidence: issue.ai_confidence,
            created_at: issue.created_at,
        }
    }
}

/// Why a [`CreateIssueRequest`] was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidRequest {
    /// Title is missing or whitespace.
    #[error("title must not be empty")]
    EmptyTitle,

    /// Location is incomplete or out of range.
    #[error(transparent)]
    Location(#[from] CoordinatesError),
}

/// Body of `POST /api/issues`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateIssueRequest {
    /// Short summary. Required, trimmed.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Free-text address or landmark. Blank counts as absent.
    pub address: Option<String>,
    /// Inferred from the title and description when omitted.
    pub category: Option<IssueCategory>,
    /// Defaults to `medium`.
    pub severity: Option<IssueSeverity>,
    /// Latitude; must come with [`Self::longitude`].
    pub latitude: Option<f64>,
    /// Longitude; must come with [`Self::latitude`].
    pub longitude: Option<f64>,
    /// Contact email. Blank counts as absent.
    pub contact_email: Option<String>,
    /// Contact phone. Blank counts as absent.
    pub contact_phone: Option<String>,
}

impl CreateIssueRequest {
    /// Validates the request and converts it to a [`NewIssue`].
    ///
    /// `infer_category` is called with the title and description only when
    /// no category was given.
    ///
    /// # Errors
    ///
    /// * [`InvalidRequest::EmptyTitle`] if the title is blank
    /// * [`InvalidRequest::Location`] if only one coordinate is given or
    ///   they are out of range
    pub fn into_new_issue(
        self,
        infer_category: impl FnOnce(&str, &str) -> IssueCategory,
    ) -> Result<NewIssue, InvalidRequest> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(InvalidRequest::EmptyTitle);
        }

        let location = Coordinates::from_parts(self.latitude, self.longitude)?;
        let category = self
            .category
            .unwrap_or_else(|| infer_category(&title, &self.description));

        Ok(NewIssue {
            title,
            description: self.description,
            address: self.address.filter(|a| !a.trim().is_empty()),
            category,
            severity: self.severity.unwrap_or_default(),
            location,
            contact_email: self.contact_email.filter(|e| !e.trim().is_empty()),
            contact_phone: self.contact_phone.filter(|p| !p.trim().is_empty()),
        })
    }
}

/// Body of `PATCH /api/issues/{id}/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    /// New status.
    pub status: IssueStatus,
}

/// Query parameters for `GET /api/issues`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IssueListParams {
    /// Only issues with this status.
    pub status: Option<IssueStatus>,
    /// Only issues in this category.
    pub category: Option<IssueCategory>,
    /// Page size, default 100.
    pub limit: Option<u32>,
    /// Rows to skip.
    pub offset: Option<u32>,
}

/// Query parameters for `GET /api/issues/weekly_report`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReportParams {
    /// Compute the report as of this instant instead of now.
    pub at: Option<DateTime<Utc>>,
}

/// Response of `POST /api/issues/{id}/photo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPhotoAnalysis {
    /// The issue after any classifier output was stored.
    pub issue: ApiIssue,
    /// What the classifier made of the photo.
    pub analysis: ClassificationOutcome,
    /// Resolution, exposure and blur checks on the photo.
    pub image_quality: ImageQuality,
}

/// Response of `POST /api/ai/analyze`.
///
/// The classification outcome is flattened, so `status` and the
/// classification fields sit next to the quality fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiImageAnalysis {
    /// What the classifier made of the image.
    #[serde(flatten)]
    pub analysis: ClassificationOutcome,
    /// Whether the image passed the quality checks overall.
    pub image_quality_good: bool,
    /// Mean quality score, in `[0, 1]`.
    pub image_quality_score: f64,
    /// Failed quality checks.
    pub image_quality_issues: Vec<QualityIssue>,
}

impl ApiImageAnalysis {
    /// Combines a classification outcome with the quality checks.
    #[must_use]
    pub fn new(analysis: ClassificationOutcome, quality: ImageQuality) -> Self {
        Self {
            analysis,
            image_quality_good: quality.is_good,
            image_quality_score: quality.score,
            image_quality_issues: quality.issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> CreateIssueRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn minimal_request_infers_category() {
        let new = request(r#"{"title":"  Trash everywhere  "}"#)
            .into_new_issue(|title, _| {
                assert_eq!(title, "Trash everywhere");
                IssueCategory::Garbage
            })
            .unwrap();
        assert_eq!(new.title, "Trash everywhere");
        assert_eq!(new.category, IssueCategory::Garbage);
        assert_eq!(new.severity, IssueSeverity::Medium);
        assert_eq!(new.location, None);
    }

    #[test]
    fn explicit_category_wins() {
        let new = request(r#"{"title":"pothole","category":"electrical"}"#)
            .into_new_issue(|_, _| IssueCategory::RoadDamage)
            .unwrap();
        assert_eq!(new.category, IssueCategory::StreetLight);
    }

    #[test]
    fn blank_title_is_rejected() {
        assert_eq!(
            request(r#"{"title":"   "}"#).into_new_issue(|_, _| IssueCategory::Other),
            Err(InvalidRequest::EmptyTitle)
        );
    }

    #[test]
    fn single_coordinate_is_rejected() {
        assert_eq!(
            request(r#"{"title":"x","latitude":12.9}"#).into_new_issue(|_, _| IssueCategory::Other),
            Err(InvalidRequest::Location(CoordinatesError::Incomplete))
        );
    }

    #[test]
    fn api_issue_flattens_location() {
        let issue = NewIssue::new("x", IssueCategory::Pollution)
            .at(Coordinates::new(1.5, -2.5).unwrap())
            .into_issue(3, Utc::now());
        let json = serde_json::to_value(ApiIssue::from(issue)).unwrap();
        assert_eq!(json["latitude"], 1.5);
        assert_eq!(json["longitude"], -2.5);
        assert_eq!(json["status"], "pending");
        assert_eq!(json["category"], "pollution");
    }

    #[test]
    fn image_analysis_flattens_outcome_next_to_quality() {
        let analysis = ApiImageAnalysis::new(
            ClassificationOutcome::Unavailable {
                reason: "offline".to_string(),
            },
            ImageQuality {
                is_good: false,
                score: 0.4,
                issues: vec![QualityIssue::TooDark, QualityIssue::Blurry],
            },
        );
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "offline");
        assert_eq!(json["image_quality_good"], false);
        assert_eq!(json["image_quality_score"], 0.4);
        assert_eq!(
            json["image_quality_issues"],
            serde_json::json!(["too_dark", "blurry"])
        );
    }

    #[test]
    fn category_listing_carries_recommendation() {
        let api = ApiCategory::from(IssueCategory::Garbage);
        assert_eq!(api.display_name, "Garbage");
        assert!(api.recommendation.is_some());
        assert!(ApiCategory::from(IssueCategory::Other).recommendation.is_none());
    }
}
