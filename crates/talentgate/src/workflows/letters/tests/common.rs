use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::audit::{ActivityEntry, ActivityError, ActivityLog};
use crate::context::{RequestContext, Role, UserId};
use crate::storage::RepositoryError;
use crate::workflows::letters::domain::{
    CommitmentLevel, EmployerId, EngagementTerms, InterestLetter, LetterId, LetterStatus,
    SignatureStatus,
};
use crate::workflows::letters::repository::{
    LetterRepository, Notification, Notifier, NotifyError,
};
use crate::workflows::letters::service::{LetterService, NewLetter, SignerDetails};
use crate::workflows::letters::signature::{
    ProviderDocument, SignatureProvider, SignatureProviderError, SigningRequest,
};
use crate::workflows::scoring::domain::{CandidateId, CandidateProfile, EvidenceSummary};
use crate::workflows::scoring::repository::CandidateRepository;

pub(super) const WEBHOOK_SECRET: &str = "test-webhook-secret";

pub(super) fn admin_ctx() -> RequestContext {
    RequestContext::new(UserId(Uuid::new_v4()), Role::Admin)
}

pub(super) fn employer_ctx() -> RequestContext {
    RequestContext::new(UserId(Uuid::new_v4()), Role::Employer)
}

pub(super) fn candidate_profile() -> CandidateProfile {
    let id = CandidateId(Uuid::new_v4());
    CandidateProfile {
        id,
        candidate_code: "TAL-0F3A91B2".to_string(),
        display_name: "Ada Qureshi".to_string(),
        contact_email: "ada@example.com".to_string(),
        field_of_expertise: "Distributed systems".to_string(),
        summary: EvidenceSummary::empty(),
        created_at: Utc::now(),
    }
}

pub(super) fn new_letter(candidate: CandidateId) -> NewLetter {
    NewLetter {
        candidate_id: candidate,
        job_posting_id: None,
        job_title: "Principal Engineer".to_string(),
        duties: "Lead the storage platform group.".to_string(),
        justification: "Candidate's published work matches our roadmap.".to_string(),
        commitment: CommitmentLevel::InterviewRequested,
        terms: EngagementTerms {
            annual_compensation_usd: Some(240_000),
            hours_per_week: Some(40),
            engagement_type: Some("full_time".to_string()),
        },
    }
}

pub(super) fn signer() -> SignerDetails {
    SignerDetails {
        email: "legal@employer.example".to_string(),
        name: "Jordan Park".to_string(),
    }
}

/// Draft letter built directly, for exercising the pure transition layer.
pub(super) fn draft_letter() -> InterestLetter {
    InterestLetter {
        id: LetterId::generate(),
        employer_id: EmployerId(Uuid::new_v4()),
        candidate_id: CandidateId(Uuid::new_v4()),
        job_posting_id: None,
        job_title: "Principal Engineer".to_string(),
        duties: "Lead the storage platform group.".to_string(),
        justification: "Candidate's published work matches our roadmap.".to_string(),
        commitment: CommitmentLevel::Evaluating,
        terms: EngagementTerms::default(),
        status: LetterStatus::Draft,
        signature_status: SignatureStatus::None,
        provider_document_id: None,
        signed_document_ref: None,
        signature_completed_at: None,
        contact_revealed_at: None,
        rejection_reason: None,
        created_at: Utc::now(),
        submitted_at: None,
        reviewed_at: None,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryLetters {
    pub(super) records: Arc<Mutex<HashMap<LetterId, InterestLetter>>>,
}

impl LetterRepository for MemoryLetters {
    fn insert(&self, letter: InterestLetter) -> Result<InterestLetter, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&letter.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(letter.id, letter.clone());
        Ok(letter)
    }

    fn fetch(&self, id: &LetterId) -> Result<Option<InterestLetter>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, letter: InterestLetter) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&letter.id) {
            guard.insert(letter.id, letter);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn find_by_provider_document(
        &self,
        provider_document_id: &str,
    ) -> Result<Option<InterestLetter>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|letter| {
                letter.provider_document_id.as_deref() == Some(provider_document_id)
            })
            .cloned())
    }

    fn pending_review(&self, limit: usize) -> Result<Vec<InterestLetter>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut pending: Vec<InterestLetter> = guard
            .values()
            .filter(|letter| letter.status == LetterStatus::PendingReview)
            .cloned()
            .collect();
        pending.sort_by_key(|letter| letter.submitted_at);
        pending.truncate(limit);
        Ok(pending)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    pub(super) records: Arc<Mutex<HashMap<CandidateId, CandidateProfile>>>,
}

impl MemoryDirectory {
    pub(super) fn with_profile(profile: CandidateProfile) -> Arc<Self> {
        let directory = Self::default();
        directory
            .records
            .lock()
            .expect("directory mutex poisoned")
            .insert(profile.id, profile);
        Arc::new(directory)
    }
}

impl CandidateRepository for MemoryDirectory {
    fn insert(&self, profile: CandidateProfile) -> Result<CandidateProfile, RepositoryError> {
        let mut guard = self.records.lock().expect("directory mutex poisoned");
        if guard.contains_key(&profile.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(profile.id, profile.clone());
        Ok(profile)
    }

    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateProfile>, RepositoryError> {
        let guard = self.records.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_summary(
        &self,
        id: &CandidateId,
        summary: &EvidenceSummary,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("directory mutex poisoned");
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
pub(super) struct MemoryNotifier {
    messages: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub(super) fn messages(&self) -> Vec<Notification> {
        self.messages.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        self.messages
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Notifier that always fails, to prove delivery is best-effort.
pub(super) struct BrokenNotifier;

impl Notifier for BrokenNotifier {
    fn deliver(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp offline".to_string()))
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

/// Signature provider returning a fixed envelope id.
pub(super) struct StubSignatureProvider;

#[async_trait]
impl SignatureProvider for StubSignatureProvider {
    async fn create_signing_request(
        &self,
        _request: &SigningRequest,
    ) -> Result<ProviderDocument, SignatureProviderError> {
        Ok(ProviderDocument {
            provider_document_id: "env-1234".to_string(),
        })
    }
}

/// Signature provider that always errors.
pub(super) struct DownSignatureProvider;

#[async_trait]
impl SignatureProvider for DownSignatureProvider {
    async fn create_signing_request(
        &self,
        _request: &SigningRequest,
    ) -> Result<ProviderDocument, SignatureProviderError> {
        Err(SignatureProviderError::Api {
            status: 502,
            message: "provider down".to_string(),
        })
    }
}

pub(super) type TestService =
    LetterService<MemoryLetters, MemoryDirectory, MemoryNotifier, MemoryActivity>;

pub(super) struct TestHarness {
    pub(super) service: TestService,
    pub(super) letters: Arc<MemoryLetters>,
    pub(super) notifier: Arc<MemoryNotifier>,
    pub(super) activity: Arc<MemoryActivity>,
    pub(super) candidate: CandidateProfile,
}

pub(super) fn build_harness(provider: Arc<dyn SignatureProvider>) -> TestHarness {
    let letters = Arc::new(MemoryLetters::default());
    let candidate = candidate_profile();
    let directory = MemoryDirectory::with_profile(candidate.clone());
    let notifier = Arc::new(MemoryNotifier::default());
    let activity = Arc::new(MemoryActivity::default());
    let service = LetterService::new(
        letters.clone(),
        directory,
        notifier.clone(),
        activity.clone(),
        provider,
        WEBHOOK_SECRET,
    );
    TestHarness {
        service,
        letters,
        notifier,
        activity,
        candidate,
    }
}
