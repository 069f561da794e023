use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::audit::{ActivityEntry, ActivityError, ActivityLog};
use crate::context::{RequestContext, Role, UserId};
use crate::storage::RepositoryError;
use crate::workflows::scoring::classifier::{
    ClassificationRequest, ClassifierError, DocumentClassifier, RawClassification,
};
use crate::workflows::scoring::criteria::CriterionKey;
use crate::workflows::scoring::domain::{
    CandidateId, CandidateProfile, DocumentId, EvidenceDocument, EvidenceSummary,
    VerificationStatus,
};
use crate::workflows::scoring::engine::ScoringEngine;
use crate::workflows::scoring::repository::{CandidateRepository, EvidenceRepository};
use crate::workflows::scoring::service::{EvidenceService, NewCandidate, NewEvidence};

pub(super) fn admin_ctx() -> RequestContext {
    RequestContext::new(UserId(Uuid::new_v4()), Role::Admin)
}

pub(super) fn candidate_ctx(candidate: &CandidateId) -> RequestContext {
    RequestContext::new(UserId(candidate.0), Role::Candidate)
}

pub(super) fn employer_ctx() -> RequestContext {
    RequestContext::new(UserId(Uuid::new_v4()), Role::Employer)
}

pub(super) fn new_candidate() -> NewCandidate {
    NewCandidate {
        display_name: "Ada Qureshi".to_string(),
        contact_email: "ada@example.com".to_string(),
        field_of_expertise: "Distributed systems".to_string(),
    }
}

pub(super) fn upload_payload(title: &str) -> NewEvidence {
    NewEvidence {
        title: title.to_string(),
        description: Some("supporting material".to_string()),
        content_type: "application/pdf".to_string(),
        content_ref: format!("uploads/{}.pdf", title.to_ascii_lowercase().replace(' ', "-")),
        extracted_text: "Recognized for outstanding contributions to the field.".to_string(),
    }
}

pub(super) fn verified_document(
    candidate: CandidateId,
    criterion: CriterionKey,
    impact: u8,
) -> EvidenceDocument {
    EvidenceDocument {
        id: DocumentId::generate(),
        candidate_id: candidate,
        title: format!("{} evidence", criterion.key()),
        description: None,
        content_type: "application/pdf".to_string(),
        content_ref: "uploads/evidence.pdf".to_string(),
        extracted_text: "extracted".to_string(),
        criterion: Some(criterion),
        score_impact: impact,
        status: VerificationStatus::Verified,
        classification: None,
        uploaded_at: Utc::now(),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryCandidates {
    pub(super) records: Arc<Mutex<HashMap<CandidateId, CandidateProfile>>>,
}

impl CandidateRepository for MemoryCandidates {
    fn insert(&self, profile: CandidateProfile) -> Result<CandidateProfile, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&profile.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(profile.id, profile.clone());
        Ok(profile)
    }

    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateProfile>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_summary(
        &self,
        id: &CandidateId,
        summary: &EvidenceSummary,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(id) {
            Some(profile) => {
                profile.summary = summary.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryEvidence {
    pub(super) records: Arc<Mutex<HashMap<DocumentId, EvidenceDocument>>>,
}

impl EvidenceRepository for MemoryEvidence {
    fn insert(&self, document: EvidenceDocument) -> Result<EvidenceDocument, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&document.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(document.id, document.clone());
        Ok(document)
    }

    fn fetch(&self, id: &DocumentId) -> Result<Option<EvidenceDocument>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, document: EvidenceDocument) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&document.id) {
            guard.insert(document.id, document);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn for_candidate(
        &self,
        candidate: &CandidateId,
    ) -> Result<Vec<EvidenceDocument>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|document| document.candidate_id == *candidate)
            .cloned()
            .collect())
    }
}

/// Evidence store whose reads fail, for no-partial-write assertions.
pub(super) struct UnreadableEvidence;

impl EvidenceRepository for UnreadableEvidence {
    fn insert(&self, _document: EvidenceDocument) -> Result<EvidenceDocument, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &DocumentId) -> Result<Option<EvidenceDocument>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _document: EvidenceDocument) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &DocumentId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_candidate(
        &self,
        _candidate: &CandidateId,
    ) -> Result<Vec<EvidenceDocument>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryActivity {
    entries: Arc<Mutex<Vec<ActivityEntry>>>,
}

impl MemoryActivity {
    pub(super) fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().expect("activity mutex poisoned").clone()
    }
}

impl ActivityLog for MemoryActivity {
    fn record(&self, entry: ActivityEntry) -> Result<(), ActivityError> {
        self.entries
            .lock()
            .expect("activity mutex poisoned")
            .push(entry);
        Ok(())
    }
}

/// Audit sink that always fails, to prove recording is best-effort.
pub(super) struct BrokenActivity;

impl ActivityLog for BrokenActivity {
    fn record(&self, _entry: ActivityEntry) -> Result<(), ActivityError> {
        Err(ActivityError::Unavailable("sink offline".to_string()))
    }
}

/// Classifier returning a fixed response.
pub(super) struct StubClassifier {
    pub(super) category: String,
    pub(super) confidence: String,
    pub(super) score_impact: i64,
}

impl StubClassifier {
    pub(super) fn returning(category: &str, confidence: &str, score_impact: i64) -> Self {
        Self {
            category: category.to_string(),
            confidence: confidence.to_string(),
            score_impact,
        }
    }
}

#[async_trait]
impl DocumentClassifier for StubClassifier {
    async fn classify(
        &self,
        _request: &ClassificationRequest,
    ) -> Result<RawClassification, ClassifierError> {
        Ok(RawClassification {
            category: self.category.clone(),
            confidence: self.confidence.clone(),
            score_impact: self.score_impact,
            rationale: "stubbed".to_string(),
        })
    }
}

/// Classifier that always errors, standing in for an unavailable provider.
pub(super) struct DownClassifier;

#[async_trait]
impl DocumentClassifier for DownClassifier {
    async fn classify(
        &self,
        _request: &ClassificationRequest,
    ) -> Result<RawClassification, ClassifierError> {
        Err(ClassifierError::Api {
            status: 503,
            message: "provider down".to_string(),
        })
    }
}

pub(super) type TestService = EvidenceService<MemoryCandidates, MemoryEvidence, MemoryActivity>;

pub(super) fn build_service(
    classifier: Arc<dyn DocumentClassifier>,
) -> (TestService, Arc<MemoryCandidates>, Arc<MemoryEvidence>, Arc<MemoryActivity>) {
    let candidates = Arc::new(MemoryCandidates::default());
    let evidence = Arc::new(MemoryEvidence::default());
    let activity = Arc::new(MemoryActivity::default());
    let service = EvidenceService::new(
        candidates.clone(),
        evidence.clone(),
        activity.clone(),
        classifier,
        ScoringEngine::default(),
    );
    (service, candidates, evidence, activity)
}

pub(super) fn registered_candidate(
    service: &TestService,
) -> (CandidateId, RequestContext) {
    let account = Uuid::new_v4();
    let ctx = RequestContext::new(UserId(account), Role::Candidate);
    let profile = service
        .register_candidate(&ctx, new_candidate())
        .expect("candidate registers");
    (profile.id, ctx)
}
