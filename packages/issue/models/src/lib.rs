#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Civic issue record and taxonomy types.
//!
//! This crate defines the canonical issue record shared across the whole
//! civicsense system: the fixed category and status sets, the optional
//! geographic location, and the input shape used when a citizen submits a
//! new report. The store, the report generator, and the API all speak in
//! these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Kind of civic problem an issue describes.
///
/// `StreetLight` also accepts `electrical` and `WaterLeak` also accepts
/// `water_supply`, the labels the image classifier reports.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueCategory {
    /// Potholes, cracks, broken road surface
    RoadDamage,
    /// Uncollected garbage and litter
    Garbage,
    /// Broken street lights and exposed electrical infrastructure
    #[serde(alias = "electrical")]
    #[strum(to_string = "street_light", serialize = "electrical")]
    StreetLight,
    /// Leaking pipes, sewage, drainage problems
    #[serde(alias = "water_supply")]
    #[strum(to_string = "water_leak", serialize = "water_supply")]
    WaterLeak,
    /// Air, noise, or water pollution
    Pollution,
    /// Waste dumped somewhere it shouldn't be
    IllegalDumping,
    /// Anything else
    Other,
}

impl IssueCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::RoadDamage,
            Self::Garbage,
            Self::StreetLight,
            Self::WaterLeak,
            Self::Pollution,
            Self::IllegalDumping,
            Self::Other,
        ]
    }

    /// Human-readable title-case name (e.g. `"Road Damage"`).
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::RoadDamage => "Road Damage",
            Self::Garbage => "Garbage",
            Self::StreetLight => "Street Light",
            Self::WaterLeak => "Water Leak",
            Self::Pollution => "Pollution",
            Self::IllegalDumping => "Illegal Dumping",
            Self::Other => "Other",
        }
    }

    /// Category-specific follow-up action for city staff, if one is
    /// defined.
    #[must_use]
    pub const fn recommendation(self) -> Option<&'static str> {
        match self {
            Self::RoadDamage => Some("Schedule road maintenance survey in affected areas"),
            Self::Garbage => Some("Increase garbage collection frequency in hotspot areas"),
            Self::StreetLight => Some("Conduct electrical infrastructure inspection"),
            Self::WaterLeak => Some("Check water distribution system for leaks"),
            Self::Pollution | Self::IllegalDumping | Self::Other => None,
        }
    }
}

/// Where an issue is in its handling lifecycle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueStatus {
    /// Reported, nobody has picked it up yet
    #[default]
    Pending,
    /// Assigned and being worked on
    InProgress,
    /// Fixed
    Resolved,
}

impl IssueStatus {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pending, Self::InProgress, Self::Resolved]
    }
}

/// Reporter-assessed urgency of an issue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueSeverity {
    /// Cosmetic or minor inconvenience
    Low,
    /// Default for new reports
    #[default]
    Medium,
    /// Safety hazard
    High,
}

/// Errors from constructing [`Coordinates`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinatesError {
    /// Latitude or longitude is outside the WGS84 range or not finite.
    #[error("coordinates out of range: ({latitude}, {longitude})")]
    OutOfRange {
        /// The rejected latitude.
        latitude: f64,
        /// The rejected longitude.
        longitude: f64,
    },

    /// Only one of latitude/longitude was supplied.
    #[error("latitude and longitude must be provided together")]
    Incomplete,
}

/// A WGS84 point. Latitude and longitude are always present together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Creates a validated coordinate pair.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatesError::OutOfRange`] if either value is not
    /// finite or lies outside `[-90, 90]` / `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinatesError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if valid {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(CoordinatesError::OutOfRange {
                latitude,
                longitude,
            })
        }
    }

    /// Builds a location from two optional parts.
    ///
    /// Returns `Ok(None)` when both are absent.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatesError::Incomplete`] if exactly one part is
    /// present, or [`CoordinatesError::OutOfRange`] if the pair is invalid.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, CoordinatesError> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => Self::new(lat, lng).map(Some),
            (None, None) => Ok(None),
            _ => Err(CoordinatesError::Incomplete),
        }
    }
}

/// A civic issue as held by the issue store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Store-assigned identifier.
    pub id: i64,
    /// Short summary.
    pub title: String,
    /// Free-text description from the reporter.
    pub description: String,
    /// Free-text address or landmark.
    pub address: Option<String>,
    /// Category chosen by the reporter (or inferred from the text).
    pub category: IssueCategory,
    /// Reporter-assessed urgency.
    pub severity: IssueSeverity,
    /// Handling status.
    pub status: IssueStatus,
    /// Geographic location, if the reporter shared one.
    pub location: Option<Coordinates>,
    /// Contact email for follow-up.
    pub contact_email: Option<String>,
    /// Contact phone for follow-up.
    pub contact_phone: Option<String>,
    /// Category suggested by the image classifier.
    pub ai_category: Option<IssueCategory>,
    /// Classifier confidence for [`Self::ai_category`], in `[0, 1]`.
    pub ai_confidence: Option<f64>,
    /// When the issue was submitted. Never changes after creation.
    pub created_at: DateTime<Utc>,
}

/// A citizen's submission, before the store assigns an ID and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIssue {
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
    /// Geographic location.
    pub location: Option<Coordinates>,
    /// Contact email.
    pub contact_email: Option<String>,
    /// Contact phone.
    pub contact_phone: Option<String>,
}

impl NewIssue {
    /// Creates a submission with only the required fields set.
    #[must_use]
    pub fn new(title: impl Into<String>, category: IssueCategory) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            address: None,
            category,
            severity: IssueSeverity::default(),
            location: None,
            contact_email: None,
            contact_phone: None,
        }
    }

    /// Sets the location.
    #[must_use]
    pub const fn at(mut self, location: Coordinates) -> Self {
        self.location = Some(location);
        self
    }

    /// Turns the submission into a stored [`Issue`]. New issues always
    /// start out [`IssueStatus::Pending`] with no classifier output.
    #[must_use]
    pub fn into_issue(self, id: i64, created_at: DateTime<Utc>) -> Issue {
        Issue {
            id,
            title: self.title,
            description: self.description,
            address: self.address,
            category: self.category,
            severity: self.severity,
            status: IssueStatus::Pending,
            location: self.location,
            contact_email: self.contact_email,
            contact_phone: self.contact_phone,
            ai_category: None,
            ai_confidence: None,
            created_at,
        }
    }
}
