//! Zero-shot image classification over HTTP.
//!
//! The endpoint receives the raw image bytes as the request body and the
//! candidate labels as a comma-separated `candidate_labels` query
//! parameter. It answers with a JSON array of `{label, score}` objects, the
//! shape Hugging Face style inference servers return for zero-shot image
//! classification.

use std::time::Duration;

use serde::Deserialize;

use crate::labels::LabelSet;
use crate::{Classification, ClassifierError, ImageClassifier};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`HttpClassifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Inference endpoint URL.
    pub url: String,
    /// Bearer token sent with every request, if any.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClassifierConfig {
    /// Reads `CLASSIFIER_URL`, `CLASSIFIER_API_KEY` and
    /// `CLASSIFIER_TIMEOUT_SECS`.
    ///
    /// Returns `None` when `CLASSIFIER_URL` is unset or empty.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Config`] if `CLASSIFIER_TIMEOUT_SECS` is
    /// not a positive integer.
    pub fn from_env() -> Result<Option<Self>, ClassifierError> {
        let Some(url) = std::env::var("CLASSIFIER_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
        else {
            return Ok(None);
        };

        let timeout = parse_timeout(std::env::var("CLASSIFIER_TIMEOUT_SECS").ok().as_deref())?;
        let api_key = std::env::var("CLASSIFIER_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        Ok(Some(Self {
            url,
            api_key,
            timeout,
        }))
    }
}

fn parse_timeout(value: Option<&str>) -> Result<Duration, ClassifierError> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ClassifierError::Config {
            message: format!("CLASSIFIER_TIMEOUT_SECS must be a positive integer, got {value:?}"),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Aligns `{label, score}` pairs to `labels` order. Labels the server
/// omitted score zero; labels it invented are dropped.
fn align_scores(labels: &LabelSet, response: &[LabelScore]) -> Result<Vec<f64>, ClassifierError> {
    let mut scores = vec![0.0; labels.len()];
    let mut matched = 0_usize;

    for entry in response {
        if let Some(i) = labels.position(&entry.label) {
            scores[i] = entry.score;
            matched += 1;
        } else {
            log::debug!("Ignoring unknown label from classifier: {}", entry.label);
        }
    }

    if matched == 0 {
        return Err(ClassifierError::EmptyScores);
    }

    Ok(scores)
}

/// [`ImageClassifier`] backed by a remote zero-shot inference endpoint.
pub struct HttpClassifier {
    config: ClassifierConfig,
    labels: LabelSet,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClassifier")
            .field("url", &self.config.url)
            .field("labels", &self.labels.len())
            .finish_non_exhaustive()
    }
}

impl HttpClassifier {
    /// Creates a classifier using the default civic label set.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        Self::with_labels(config, LabelSet::default())
    }

    /// Creates a classifier with a custom label set.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Http`] if the HTTP client cannot be built.
    pub fn with_labels(config: ClassifierConfig, labels: LabelSet) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            labels,
            client,
        })
    }
}

#[async_trait::async_trait]
impl ImageClassifier for HttpClassifier {
    async fn classify(&self, image: &[u8]) -> Result<Classification, ClassifierError> {
        if image.is_empty() {
            return Err(ClassifierError::EmptyImage);
        }

        let candidate_labels = self.labels.texts().collect::<Vec<_>>().join(",");

        let mut request = self
            .client
            .post(&self.config.url)
            .query(&[("candidate_labels", candidate_labels.as_str())])
            .header("content-type", "application/octet-stream")
            .body(image.to_vec());

        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClassifierError::Provider {
                message: format!("HTTP {status}: {body}"),
            });
        }

        let entries: Vec<LabelScore> = serde_json::from_str(&body)?;
        let scores = align_scores(&self.labels, &entries)?;
        let classification = Classification::from_scores(&self.labels, &scores)?;

        log::debug!(
            "Classified {} byte image as {} ({:.3})",
            image.len(),
            classification.category,
            classification.confidence
        );

        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use civicsense_issue_models::IssueCategory;

    use super::*;

    #[test]
    fn missing_timeout_uses_default() {
        assert_eq!(parse_timeout(None).unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout(Some(" 5 ")).unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn invalid_timeout_is_config_error() {
        assert!(matches!(
            parse_timeout(Some("0")),
            Err(ClassifierError::Config { .. })
        ));
        assert!(matches!(
            parse_timeout(Some("soon")),
            Err(ClassifierError::Config { .. })
        ));
    }

    #[test]
    fn response_scores_align_to_label_order() {
        let labels = LabelSet::default();
        let response: Vec<LabelScore> = serde_json::from_str(
            r#"[{"label":"sewage","score":0.7},{"label":"Pothole","score":0.2},{"label":"dragon","score":0.1}]"#,
        )
        .unwrap();

        let scores = align_scores(&labels, &response).unwrap();
        assert_eq!(scores.len(), labels.len());
        assert!((scores[labels.position("sewage").unwrap()] - 0.7).abs() < f64::EPSILON);
        assert!((scores[0] - 0.2).abs() < f64::EPSILON);

        let classification = Classification::from_scores(&labels, &scores).unwrap();
        assert_eq!(classification.category, IssueCategory::WaterLeak);
        assert_eq!(classification.detected_label, "sewage");
    }

    #[test]
    fn response_with_no_known_labels_is_empty() {
        let labels = LabelSet::default();
        let response = vec![LabelScore {
            label: "dragon".to_string(),
            score: 1.0,
        }];
        assert!(matches!(
            align_scores(&labels, &response),
            Err(ClassifierError::EmptyScores)
        ));
    }

    #[tokio::test]
    async fn empty_image_is_rejected_before_any_request() {
        let classifier = HttpClassifier::new(ClassifierConfig {
            url: "http://127.0.0.1:9/classify".to_string(),
            api_key: None,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert!(matches!(
            classifier.classify(&[]).await,
            Err(ClassifierError::EmptyImage)
        ));
    }
}
