#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Civic issue classification.
//!
//! Two classifiers live here. [`ImageClassifier`] implementations score an
//! uploaded photo against a [`LabelSet`] of descriptive prompts (the
//! bundled [`HttpClassifier`] delegates to a zero-shot inference server).
//! [`classify_text`] is a cheap keyword scan over the same labels, used to
//! pre-fill the category of a text-only report.
//!
//! Image classification is advisory. Callers that cannot fail on it use
//! [`classify_or_unavailable`], which turns a missing classifier or a
//! failed call into [`ClassificationOutcome::Unavailable`]. Photos are also
//! checked locally for resolution, exposure and blur by
//! [`analyze_image_quality`].

pub mod http;
pub mod labels;
pub mod quality;

use civicsense_issue_models::IssueCategory;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::{ClassifierConfig, HttpClassifier};
pub use labels::{Label, LabelSet};
pub use quality::{ImageQuality, QualityIssue, analyze_image_quality};

/// Number of detections kept in a [`Classification`].
pub const TOP_DETECTIONS: usize = 3;

/// Errors that can occur during classification.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// HTTP request to the inference endpoint failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The inference endpoint returned an error status.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// No usable scores were produced.
    #[error("Classifier returned no usable scores")]
    EmptyScores,

    /// Score count does not match the label count.
    #[error("Expected {expected} scores, got {actual}")]
    ScoreMismatch {
        /// Number of labels.
        expected: usize,
        /// Number of scores received.
        actual: usize,
    },

    /// The image body was empty.
    #[error("Image is empty")]
    EmptyImage,

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// One scored label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Label text as sent to the classifier.
    pub label: String,
    /// Score for this label, in `[0, 1]`.
    pub confidence: f64,
    /// Category the label maps to.
    pub category: IssueCategory,
}

/// Result of classifying one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Category of the highest scoring label.
    pub category: IssueCategory,
    /// Score of the highest scoring label.
    pub confidence: f64,
    /// The highest scoring label itself.
    pub detected_label: String,
    /// Up to [`TOP_DETECTIONS`] best labels, best first.
    pub detections: Vec<Detection>,
}

impl Classification {
    /// Builds a classification from per-label scores aligned with `labels`.
    ///
    /// The best label wins; on a tie the earlier label wins.
    ///
    /// # Errors
    ///
    /// * [`ClassifierError::EmptyScores`] if there are no scores
    /// * [`ClassifierError::ScoreMismatch`] if `scores` and `labels` differ
    ///   in length
    pub fn from_scores(labels: &LabelSet, scores: &[f64]) -> Result<Self, ClassifierError> {
        if scores.is_empty() {
            return Err(ClassifierError::EmptyScores);
        }
        if scores.len() != labels.len() {
            return Err(ClassifierError::ScoreMismatch {
                expected: labels.len(),
                actual: scores.len(),
            });
        }

        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        // Stable, so equal scores keep label order.
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let detections: Vec<Detection> = ranked
            .iter()
            .take(TOP_DETECTIONS)
            .filter_map(|&i| {
                labels.get(i).map(|label| Detection {
                    label: label.text.clone(),
                    confidence: scores[i],
                    category: label.category,
                })
            })
            .collect();

        let best = detections.first().ok_or(ClassifierError::EmptyScores)?;

        Ok(Self {
            category: best.category,
            confidence: best.confidence,
            detected_label: best.label.clone(),
            detections,
        })
    }
}

/// Scores images against a label set.
#[async_trait::async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Classifies one encoded image.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if the image cannot be classified.
    async fn classify(&self, image: &[u8]) -> Result<Classification, ClassifierError>;
}

/// Classification result that never fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassificationOutcome {
    /// The image was classified.
    Classified(Classification),
    /// No classification is available.
    Unavailable {
        /// Why not.
        reason: String,
    },
}

impl ClassificationOutcome {
    /// The classification, if there is one.
    #[must_use]
    pub const fn classification(&self) -> Option<&Classification> {
        match self {
            Self::Classified(c) => Some(c),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Runs `classifier` on `image`, folding every failure into
/// [`ClassificationOutcome::Unavailable`].
pub async fn classify_or_unavailable(
    classifier: Option<&dyn ImageClassifier>,
    image: &[u8],
) -> ClassificationOutcome {
    let Some(classifier) = classifier else {
        return ClassificationOutcome::Unavailable {
            reason: "Image classifier is not configured".to_string(),
        };
    };

    match classifier.classify(image).await {
        Ok(classification) => ClassificationOutcome::Classified(classification),
        Err(e) => {
            log::warn!("Image classification failed: {e}");
            ClassificationOutcome::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

/// Picks a category for a text-only report using the default label set.
#[must_use]
pub fn classify_text(title: &str, description: &str) -> IssueCategory {
    LabelSet::default().classify_text(title, description)
}

/// Creates an [`HttpClassifier`] from environment variables.
///
/// Returns `Ok(None)` when `CLASSIFIER_URL` is not set, meaning image
/// classification is unavailable.
///
/// # Errors
///
/// Returns [`ClassifierError`] if the configuration is invalid or the HTTP
/// client cannot be built.
pub fn create_classifier_from_env() -> Result<Option<HttpClassifier>, ClassifierError> {
    ClassifierConfig::from_env()?
        .map(HttpClassifier::new)
        .transpose()
}
