use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::criteria::{CriterionKey, FALLBACK_CRITERION, FALLBACK_SCORE_IMPACT};
use super::domain::{Classification, Confidence};

const CLASSIFIER_TIMEOUT_SECS: u64 = 30;

/// Text handed to the classification provider.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRequest {
    pub text: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Unsanitized provider response. `category` and `confidence` are free
/// strings on the wire and must pass through [`sanitize`] before use.
#[derive(Debug, Clone, Deserialize)]
pub struct RawClassification {
    pub category: String,
    pub confidence: String,
    pub score_impact: i64,
    pub rationale: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("classifier API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Boundary trait for the external text-classification provider.
#[async_trait]
pub trait DocumentClassifier: Send + Sync {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<RawClassification, ClassifierError>;
}

/// Coerce a provider response into the fixed criterion set.
///
/// A category outside the eight is never propagated: it is replaced by the
/// fallback criterion at low confidence with a minimal score impact, logged
/// but not failed. Recognized categories get their impact clamped into
/// `[0, max_score]`.
pub fn sanitize(raw: &RawClassification) -> Classification {
    let Some(criterion) = CriterionKey::from_key(&raw.category) else {
        warn!(
            category = %raw.category,
            "classifier returned unknown category, substituting fallback"
        );
        return Classification {
            criterion: FALLBACK_CRITERION,
            confidence: Confidence::Low,
            score_impact: FALLBACK_SCORE_IMPACT,
            rationale: raw.rationale.clone(),
        };
    };

    let confidence = Confidence::parse(&raw.confidence).unwrap_or(Confidence::Low);
    let cap = criterion.spec().max_score;
    let score_impact = raw.score_impact.clamp(0, cap as i64) as u8;

    Classification {
        criterion,
        confidence,
        score_impact,
        rationale: raw.rationale.clone(),
    }
}

/// Classification used when every provider is unavailable: the upload still
/// succeeds, carrying the fallback criterion at low confidence.
pub fn offline_fallback() -> Classification {
    Classification {
        criterion: FALLBACK_CRITERION,
        confidence: Confidence::Low,
        score_impact: FALLBACK_SCORE_IMPACT,
        rationale: "classification providers unavailable; assigned fallback category".to_string(),
    }
}

/// Primary provider with a secondary fallback. The secondary is only
/// consulted after the primary errors; its failure propagates so the caller
/// can apply [`offline_fallback`].
pub struct TieredClassifier<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> TieredClassifier<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P, S> DocumentClassifier for TieredClassifier<P, S>
where
    P: DocumentClassifier,
    S: DocumentClassifier,
{
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<RawClassification, ClassifierError> {
        match self.primary.classify(request).await {
            Ok(raw) => Ok(raw),
            Err(err) => {
                warn!(error = %err, "primary classifier failed, trying secondary");
                self.secondary.classify(request).await
            }
        }
    }
}

/// JSON-over-HTTP classification provider.
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(CLASSIFIER_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl DocumentClassifier for HttpClassifier {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<RawClassification, ClassifierError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<RawClassification>().await?)
    }
}
