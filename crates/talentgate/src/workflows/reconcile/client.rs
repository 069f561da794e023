use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::SessionStatus;

const SCORING_TIMEOUT_SECS: u64 = 30;

/// Poll result for one provider session.
#[derive(Debug, Clone)]
pub struct SessionPoll {
    pub status: SessionStatus,
    pub report: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringClientError {
    #[error("scoring service HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("scoring service API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("scoring service returned unrecognized session status '{0}'")]
    UnknownStatus(String),
}

/// Boundary trait for the external scoring service.
#[async_trait]
pub trait ExternalScoringClient: Send + Sync {
    /// Open a new session; returns the provider's session id.
    async fn create_session(&self, candidate_code: &str) -> Result<String, ScoringClientError>;
    /// Current state of a session.
    async fn fetch_session(
        &self,
        provider_session_id: &str,
    ) -> Result<SessionPoll, ScoringClientError>;
}

#[derive(Debug, Serialize)]
struct CreateSessionBody<'a> {
    candidate_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateSessionWire {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct SessionPollWire {
    status: String,
    report: Option<Value>,
}

/// JSON-over-HTTP scoring service client.
pub struct HttpScoringClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpScoringClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(SCORING_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ScoringClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(ScoringClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ExternalScoringClient for HttpScoringClient {
    async fn create_session(&self, candidate_code: &str) -> Result<String, ScoringClientError> {
        let response = self
            .client
            .post(format!("{}/sessions", self.endpoint))
            .header("x-api-key", &self.api_key)
            .json(&CreateSessionBody { candidate_code })
            .send()
            .await?;
        let created = Self::check(response)
            .await?
            .json::<CreateSessionWire>()
            .await?;
        Ok(created.session_id)
    }

    async fn fetch_session(
        &self,
        provider_session_id: &str,
    ) -> Result<SessionPoll, ScoringClientError> {
        let response = self
            .client
            .get(format!("{}/sessions/{provider_session_id}", self.endpoint))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        let wire = Self::check(response)
            .await?
            .json::<SessionPollWire>()
            .await?;

        let status = SessionStatus::parse(&wire.status)
            .ok_or(ScoringClientError::UnknownStatus(wire.status))?;
        Ok(SessionPoll {
            status,
            report: wire.report,
        })
    }
}
