use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::storage::RepositoryError;
use crate::workflows::scoring::CandidateId;

/// Identifier wrapper for scoring sessions on our side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Lifecycle of a session at the external scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SessionStatus::Queued => "queued",
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => Some(SessionStatus::Queued),
            "processing" => Some(SessionStatus::Processing),
            "completed" => Some(SessionStatus::Completed),
            "failed" => Some(SessionStatus::Failed),
            _ => None,
        }
    }

    /// Terminal sessions are skipped by reconciliation.
    pub const fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

/// Summary fields lifted out of a completed report for list views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExtract {
    pub external_score: Option<u8>,
    pub assessment: Option<String>,
}

impl SessionExtract {
    /// Pull the well-known fields out of the provider report; anything the
    /// provider adds beyond them stays available in the verbatim copy.
    pub fn from_report(report: &Value) -> Self {
        Self {
            external_score: report
                .get("overall_score")
                .and_then(Value::as_u64)
                .map(|score| score.min(100) as u8),
            assessment: report
                .get("assessment")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// One scoring session tracked against the external service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringSession {
    pub id: SessionId,
    pub candidate_id: CandidateId,
    pub provider_session_id: String,
    pub status: SessionStatus,
    /// Provider report persisted verbatim on completion.
    pub report: Option<Value>,
    pub extract: Option<SessionExtract>,
    pub requested_at: DateTime<Utc>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Storage abstraction over scoring sessions.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, session: ScoringSession) -> Result<ScoringSession, RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<ScoringSession>, RepositoryError>;
    fn update(&self, session: ScoringSession) -> Result<(), RepositoryError>;
    /// Sessions still worth polling, oldest request first.
    fn non_terminal(&self) -> Result<Vec<ScoringSession>, RepositoryError>;
}
