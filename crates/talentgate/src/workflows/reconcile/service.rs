use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::context::{RequestContext, Role};
use crate::error::AppError;
use crate::workflows::scoring::{CandidateId, CandidateRepository};

use super::client::ExternalScoringClient;
use super::domain::{
    ScoringSession, SessionExtract, SessionId, SessionRepository, SessionStatus,
};

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub completed: usize,
    pub failed: usize,
    pub still_pending: usize,
    pub poll_failures: usize,
}

/// Session state as exposed to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub status: &'static str,
    pub external_score: Option<u8>,
    pub assessment: Option<String>,
}

impl SessionView {
    fn from_session(session: &ScoringSession) -> Self {
        Self {
            session_id: session.id,
            status: session.status.label(),
            external_score: session
                .extract
                .as_ref()
                .and_then(|extract| extract.external_score),
            assessment: session
                .extract
                .as_ref()
                .and_then(|extract| extract.assessment.clone()),
        }
    }
}

/// Service wrapping session creation and the reconciliation batch.
pub struct ReconcileService<S, C> {
    sessions: Arc<S>,
    candidates: Arc<C>,
    client: Arc<dyn ExternalScoringClient>,
    pause: Duration,
}

impl<S, C> ReconcileService<S, C>
where
    S: SessionRepository + 'static,
    C: CandidateRepository + 'static,
{
    pub fn new(
        sessions: Arc<S>,
        candidates: Arc<C>,
        client: Arc<dyn ExternalScoringClient>,
        pause: Duration,
    ) -> Self {
        Self {
            sessions,
            candidates,
            client,
            pause,
        }
    }

    /// Open a new session with the external scoring service.
    pub async fn request_scoring(
        &self,
        ctx: &RequestContext,
        candidate_id: CandidateId,
    ) -> Result<SessionView, AppError> {
        if !(ctx.is_admin() || ctx.acts_as(Role::Candidate, candidate_id.0)) {
            return Err(AppError::Forbidden(
                "scoring sessions belong to the candidate".to_string(),
            ));
        }
        let profile = self
            .candidates
            .fetch(&candidate_id)?
            .ok_or_else(|| AppError::NotFound(format!("candidate {}", candidate_id.0)))?;

        let provider_session_id = self
            .client
            .create_session(&profile.candidate_code)
            .await
            .map_err(|err| AppError::Upstream(err.to_string()))?;

        let session = ScoringSession {
            id: SessionId::generate(),
            candidate_id,
            provider_session_id,
            status: SessionStatus::Queued,
            report: None,
            extract: None,
            requested_at: Utc::now(),
            last_checked_at: None,
        };
        let stored = self.sessions.insert(session)?;
        Ok(SessionView::from_session(&stored))
    }

    /// Current state of one session.
    pub fn session(
        &self,
        ctx: &RequestContext,
        session_id: SessionId,
    ) -> Result<SessionView, AppError> {
        let session = self
            .sessions
            .fetch(&session_id)?
            .ok_or_else(|| AppError::NotFound(format!("session {}", session_id.0)))?;
        if !(ctx.is_admin() || ctx.acts_as(Role::Candidate, session.candidate_id.0)) {
            return Err(AppError::Forbidden(
                "scoring sessions belong to the candidate".to_string(),
            ));
        }
        Ok(SessionView::from_session(&session))
    }

    /// Poll every non-terminal session once, sequentially.
    ///
    /// Idempotent and safe to re-run on any schedule: terminal sessions are
    /// never touched, each update stands alone, and a per-session poll
    /// failure is logged and skipped. A fixed pause separates provider calls
    /// to respect rate limits.
    pub async fn run(&self) -> Result<ReconcileReport, AppError> {
        let pending = self.sessions.non_terminal()?;
        let mut report = ReconcileReport {
            checked: pending.len(),
            ..ReconcileReport::default()
        };

        for (index, session) in pending.into_iter().enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            let poll = match self.client.fetch_session(&session.provider_session_id).await {
                Ok(poll) => poll,
                Err(err) => {
                    warn!(
                        session = %session.id.0,
                        error = %err,
                        "session poll failed, will retry next run"
                    );
                    report.poll_failures += 1;
                    continue;
                }
            };

            let mut updated = session;
            updated.status = poll.status;
            updated.last_checked_at = Some(Utc::now());
            if poll.status == SessionStatus::Completed {
                if let Some(provider_report) = poll.report {
                    updated.extract = Some(SessionExtract::from_report(&provider_report));
                    updated.report = Some(provider_report);
                }
            }

            match poll.status {
                SessionStatus::Completed => report.completed += 1,
                SessionStatus::Failed => report.failed += 1,
                SessionStatus::Queued | SessionStatus::Processing => report.still_pending += 1,
            }

            if let Err(err) = self.sessions.update(updated) {
                warn!(error = %err, "session update failed, will retry next run");
                report.poll_failures += 1;
            }
        }

        info!(
            checked = report.checked,
            completed = report.completed,
            failed = report.failed,
            "scoring session reconciliation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::context::UserId;
    use crate::storage::RepositoryError;
    use crate::workflows::reconcile::client::{ScoringClientError, SessionPoll};
    use crate::workflows::scoring::domain::{CandidateProfile, EvidenceSummary};

    #[derive(Default)]
    struct MemorySessions {
        records: Mutex<HashMap<SessionId, ScoringSession>>,
    }

    impl SessionRepository for MemorySessions {
        fn insert(&self, session: ScoringSession) -> Result<ScoringSession, RepositoryError> {
            let mut guard = self.records.lock().expect("session mutex poisoned");
            guard.insert(session.id, session.clone());
            Ok(session)
        }

        fn fetch(&self, id: &SessionId) -> Result<Option<ScoringSession>, RepositoryError> {
            let guard = self.records.lock().expect("session mutex poisoned");
            Ok(guard.get(id).cloned())
        }

        fn update(&self, session: ScoringSession) -> Result<(), RepositoryError> {
            let mut guard = self.records.lock().expect("session mutex poisoned");
            guard.insert(session.id, session);
            Ok(())
        }

        fn non_terminal(&self) -> Result<Vec<ScoringSession>, RepositoryError> {
            let guard = self.records.lock().expect("session mutex poisoned");
            let mut pending: Vec<ScoringSession> = guard
                .values()
                .filter(|session| !session.status.is_terminal())
                .cloned()
                .collect();
            pending.sort_by_key(|session| session.requested_at);
            Ok(pending)
        }
    }

    #[derive(Default)]
    struct MemoryCandidates {
        records: Mutex<HashMap<CandidateId, CandidateProfile>>,
    }

    impl CandidateRepository for MemoryCandidates {
        fn insert(&self, profile: CandidateProfile) -> Result<CandidateProfile, RepositoryError> {
            let mut guard = self.records.lock().expect("candidate mutex poisoned");
            guard.insert(profile.id, profile.clone());
            Ok(profile)
        }

        fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateProfile>, RepositoryError> {
            let guard = self.records.lock().expect("candidate mutex poisoned");
            Ok(guard.get(id).cloned())
        }

        fn update_summary(
            &self,
            _id: &CandidateId,
            _summary: &EvidenceSummary,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    /// Client that answers from a fixed table; unknown sessions error.
    struct TableClient {
        responses: HashMap<String, SessionPoll>,
    }

    impl TableClient {
        fn new(responses: HashMap<String, SessionPoll>) -> Self {
            Self { responses }
        }
    }

    #[async_trait]
    impl ExternalScoringClient for TableClient {
        async fn create_session(
            &self,
            _candidate_code: &str,
        ) -> Result<String, ScoringClientError> {
            Ok("ext-0001".to_string())
        }

        async fn fetch_session(
            &self,
            provider_session_id: &str,
        ) -> Result<SessionPoll, ScoringClientError> {
            self.responses
                .get(provider_session_id)
                .cloned()
                .map(Ok)
                .unwrap_or(Err(ScoringClientError::Api {
                    status: 500,
                    message: "boom".to_string(),
                }))
        }
    }

    fn session(provider_id: &str, status: SessionStatus) -> ScoringSession {
        ScoringSession {
            id: SessionId::generate(),
            candidate_id: CandidateId(Uuid::new_v4()),
            provider_session_id: provider_id.to_string(),
            status,
            report: None,
            extract: None,
            requested_at: Utc::now(),
            last_checked_at: None,
        }
    }

    fn profile() -> CandidateProfile {
        let id = CandidateId(Uuid::new_v4());
        CandidateProfile {
            id,
            candidate_code: "TAL-AB12CD34".to_string(),
            display_name: "Ada Qureshi".to_string(),
            contact_email: "ada@example.com".to_string(),
            field_of_expertise: "Distributed systems".to_string(),
            summary: EvidenceSummary::empty(),
            created_at: Utc::now(),
        }
    }

    fn build(
        responses: HashMap<String, SessionPoll>,
    ) -> (
        ReconcileService<MemorySessions, MemoryCandidates>,
        Arc<MemorySessions>,
        Arc<MemoryCandidates>,
    ) {
        let sessions = Arc::new(MemorySessions::default());
        let candidates = Arc::new(MemoryCandidates::default());
        let service = ReconcileService::new(
            sessions.clone(),
            candidates.clone(),
            Arc::new(TableClient::new(responses)),
            Duration::ZERO,
        );
        (service, sessions, candidates)
    }

    #[tokio::test]
    async fn run_updates_only_non_terminal_sessions() {
        let mut responses = HashMap::new();
        responses.insert(
            "ext-a".to_string(),
            SessionPoll {
                status: SessionStatus::Completed,
                report: Some(json!({
                    "overall_score": 82,
                    "assessment": "strong publication record"
                })),
            },
        );
        responses.insert(
            "ext-b".to_string(),
            SessionPoll {
                status: SessionStatus::Processing,
                report: None,
            },
        );

        let (service, sessions, _) = build(responses);
        let queued = sessions
            .insert(session("ext-a", SessionStatus::Queued))
            .expect("insert");
        sessions
            .insert(session("ext-b", SessionStatus::Processing))
            .expect("insert");
        let done = sessions
            .insert(session("ext-done", SessionStatus::Completed))
            .expect("insert");

        let report = service.run().await.expect("run succeeds");
        assert_eq!(report.checked, 2, "terminal session is skipped");
        assert_eq!(report.completed, 1);
        assert_eq!(report.still_pending, 1);
        assert_eq!(report.poll_failures, 0);

        let stored = sessions
            .fetch(&queued.id)
            .expect("fetch")
            .expect("session present");
        assert_eq!(stored.status, SessionStatus::Completed);
        let extract = stored.extract.expect("summary extracted");
        assert_eq!(extract.external_score, Some(82));
        assert_eq!(
            extract.assessment.as_deref(),
            Some("strong publication record")
        );
        assert!(stored.report.is_some(), "report persisted verbatim");

        let untouched = sessions
            .fetch(&done.id)
            .expect("fetch")
            .expect("session present");
        assert!(untouched.last_checked_at.is_none());
    }

    #[tokio::test]
    async fn run_is_idempotent_once_everything_is_terminal() {
        let mut responses = HashMap::new();
        responses.insert(
            "ext-a".to_string(),
            SessionPoll {
                status: SessionStatus::Failed,
                report: None,
            },
        );

        let (service, sessions, _) = build(responses);
        sessions
            .insert(session("ext-a", SessionStatus::Queued))
            .expect("insert");

        let first = service.run().await.expect("first run");
        assert_eq!(first.failed, 1);

        let second = service.run().await.expect("second run");
        assert_eq!(second, ReconcileReport::default());
    }

    #[tokio::test]
    async fn a_failing_poll_is_skipped_and_the_batch_continues() {
        let mut responses = HashMap::new();
        responses.insert(
            "ext-b".to_string(),
            SessionPoll {
                status: SessionStatus::Completed,
                report: None,
            },
        );

        let (service, sessions, _) = build(responses);
        let broken = sessions
            .insert(session("ext-unknown", SessionStatus::Queued))
            .expect("insert");
        let fine = sessions
            .insert(session("ext-b", SessionStatus::Queued))
            .expect("insert");

        let report = service.run().await.expect("run survives bad poll");
        assert_eq!(report.poll_failures, 1);
        assert_eq!(report.completed, 1);

        let still_queued = sessions
            .fetch(&broken.id)
            .expect("fetch")
            .expect("session present");
        assert_eq!(still_queued.status, SessionStatus::Queued);
        let completed = sessions
            .fetch(&fine.id)
            .expect("fetch")
            .expect("session present");
        assert_eq!(completed.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn request_scoring_enforces_ownership_and_candidate_existence() {
        let (service, _, candidates) = build(HashMap::new());
        let profile = profile();
        candidates.insert(profile.clone()).expect("seed profile");

        let stranger = RequestContext::new(UserId(Uuid::new_v4()), Role::Candidate);
        match service.request_scoring(&stranger, profile.id).await {
            Err(AppError::Forbidden(_)) => {}
            other => panic!("expected forbidden, got {other:?}"),
        }

        let owner = RequestContext::new(UserId(profile.id.0), Role::Candidate);
        match service
            .request_scoring(&owner, CandidateId(Uuid::new_v4()))
            .await
        {
            Err(AppError::Forbidden(_)) => {}
            other => panic!("expected forbidden for foreign id, got {other:?}"),
        }

        let view = service
            .request_scoring(&owner, profile.id)
            .await
            .expect("session opens");
        assert_eq!(view.status, "queued");

        let fetched = service
            .session(&owner, view.session_id)
            .expect("owner reads session");
        assert_eq!(fetched.status, "queued");
    }
}
