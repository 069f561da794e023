use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;
use uuid::Uuid;

use talentgate::audit::{ActivityEntry, ActivityError, ActivityLog};
use talentgate::context::UserId;
use talentgate::storage::RepositoryError;
use talentgate::workflows::letters::{
    InterestLetter, LetterId, LetterRepository, LetterStatus, Notification, Notifier,
    NotifyError, ProviderDocument, SignatureProvider, SignatureProviderError, SigningRequest,
};
use talentgate::workflows::promo::{
    CheckoutSession, CustomerId, PaymentError, PaymentProvider, PromoCode, PromoRepository,
    Redemption, SubscriptionRecord, SubscriptionRepository,
};
use talentgate::workflows::reconcile::{
    ExternalScoringClient, ScoringClientError, ScoringSession, SessionId, SessionPoll,
    SessionRepository, SessionStatus,
};
use talentgate::workflows::scoring::{
    CandidateId, CandidateProfile, CandidateRepository, ClassificationRequest, ClassifierError,
    DocumentClassifier, DocumentId, EvidenceDocument, EvidenceRepository, EvidenceSummary,
    RawClassification,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCandidateRepository {
    records: Arc<Mutex<HashMap<CandidateId, CandidateProfile>>>,
}

impl CandidateRepository for InMemoryCandidateRepository {
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
pub(crate) struct InMemoryEvidenceRepository {
    records: Arc<Mutex<HashMap<DocumentId, EvidenceDocument>>>,
}

impl EvidenceRepository for InMemoryEvidenceRepository {
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

#[derive(Default, Clone)]
pub(crate) struct InMemoryLetterRepository {
    records: Arc<Mutex<HashMap<LetterId, InterestLetter>>>,
}

impl LetterRepository for InMemoryLetterRepository {
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
            .find(|letter| letter.provider_document_id.as_deref() == Some(provider_document_id))
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
pub(crate) struct InMemorySessionRepository {
    records: Arc<Mutex<HashMap<SessionId, ScoringSession>>>,
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, session: ScoringSession) -> Result<ScoringSession, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(session.id, session.clone());
        Ok(session)
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<ScoringSession>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, session: ScoringSession) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(session.id, session);
        Ok(())
    }

    fn non_terminal(&self) -> Result<Vec<ScoringSession>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut pending: Vec<ScoringSession> = guard
            .values()
            .filter(|session| !session.status.is_terminal())
            .cloned()
            .collect();
        pending.sort_by_key(|session| session.requested_at);
        Ok(pending)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPromoRepository {
    codes: Arc<Mutex<HashMap<String, PromoCode>>>,
    redemptions: Arc<Mutex<HashSet<(String, UserId)>>>,
}

impl PromoRepository for InMemoryPromoRepository {
    fn insert(&self, promo: PromoCode) -> Result<PromoCode, RepositoryError> {
        let mut guard = self.codes.lock().expect("repository mutex poisoned");
        if guard.contains_key(&promo.code) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(promo.code.clone(), promo.clone());
        Ok(promo)
    }

    fn fetch(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError> {
        let guard = self.codes.lock().expect("repository mutex poisoned");
        Ok(guard.get(code).cloned())
    }

    fn update(&self, promo: PromoCode) -> Result<(), RepositoryError> {
        let mut guard = self.codes.lock().expect("repository mutex poisoned");
        guard.insert(promo.code.clone(), promo);
        Ok(())
    }

    fn record_redemption(&self, redemption: Redemption) -> Result<(), RepositoryError> {
        let mut guard = self.redemptions.lock().expect("repository mutex poisoned");
        if !guard.insert((redemption.code.clone(), redemption.user_id)) {
            return Err(RepositoryError::Conflict);
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySubscriptionRepository {
    records: Arc<Mutex<HashMap<UserId, SubscriptionRecord>>>,
}

impl SubscriptionRepository for InMemorySubscriptionRepository {
    fn fetch_by_user(
        &self,
        user: &UserId,
    ) -> Result<Option<SubscriptionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(user).cloned())
    }

    fn insert(&self, record: SubscriptionRecord) -> Result<SubscriptionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.user_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.user_id, record.clone());
        Ok(record)
    }
}

/// Notification sink that logs deliveries and keeps them for inspection.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotifier {
    messages: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotifier {
    pub(crate) fn messages(&self) -> Vec<Notification> {
        self.messages.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for InMemoryNotifier {
    fn deliver(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            template = %notification.template,
            recipient = ?notification.recipient,
            "notification dispatched"
        );
        self.messages
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryActivityLog {
    entries: Arc<Mutex<Vec<ActivityEntry>>>,
}

impl InMemoryActivityLog {
    pub(crate) fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.lock().expect("activity mutex poisoned").clone()
    }
}

impl ActivityLog for InMemoryActivityLog {
    fn record(&self, entry: ActivityEntry) -> Result<(), ActivityError> {
        self.entries
            .lock()
            .expect("activity mutex poisoned")
            .push(entry);
        Ok(())
    }
}

/// Offline classifier used when no provider endpoint is configured: routes
/// on obvious keywords so development and demos work without credentials.
pub(crate) struct KeywordClassifier;

#[async_trait]
impl DocumentClassifier for KeywordClassifier {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<RawClassification, ClassifierError> {
        let haystack = format!(
            "{} {} {}",
            request.title.as_deref().unwrap_or_default(),
            request.description.as_deref().unwrap_or_default(),
            request.text
        )
        .to_ascii_lowercase();

        let rules: [(&str, &str, i64); 8] = [
            ("award", "awards", 10),
            ("membership", "membership", 6),
            ("press", "press", 8),
            ("judge", "judging", 6),
            ("patent", "original_contribution", 12),
            ("journal", "scholarly_articles", 7),
            ("lead", "critical_employment", 8),
            ("salary", "high_remuneration", 6),
        ];

        let (category, score_impact) = rules
            .iter()
            .find(|(needle, _, _)| haystack.contains(needle))
            .map(|(_, category, impact)| (*category, *impact))
            .unwrap_or(("press", 2));

        Ok(RawClassification {
            category: category.to_string(),
            confidence: "medium".to_string(),
            score_impact,
            rationale: "keyword heuristic (offline classifier)".to_string(),
        })
    }
}

/// Signature provider stand-in that mints envelope ids locally.
pub(crate) struct SimulatedSignatureProvider;

#[async_trait]
impl SignatureProvider for SimulatedSignatureProvider {
    async fn create_signing_request(
        &self,
        request: &SigningRequest,
    ) -> Result<ProviderDocument, SignatureProviderError> {
        info!(letter = %request.letter_id.0, "simulated signing request created");
        Ok(ProviderDocument {
            provider_document_id: format!("env-{}", Uuid::new_v4().simple()),
        })
    }
}

/// Payment provider stand-in answering with deterministic handles.
pub(crate) struct SimulatedPaymentProvider;

#[async_trait]
impl PaymentProvider for SimulatedPaymentProvider {
    async fn create_customer(&self, email: &str) -> Result<CustomerId, PaymentError> {
        info!(%email, "simulated payment customer created");
        Ok(CustomerId(format!("cus_{}", Uuid::new_v4().simple())))
    }

    async fn create_checkout_session(
        &self,
        customer: &CustomerId,
        plan: &str,
        coupon_id: Option<&str>,
    ) -> Result<CheckoutSession, PaymentError> {
        let coupon = coupon_id.unwrap_or("none");
        Ok(CheckoutSession {
            url: format!(
                "https://pay.example/checkout/{}?plan={plan}&coupon={coupon}",
                customer.0
            ),
        })
    }

    async fn create_coupon(&self, percent_off: u8) -> Result<String, PaymentError> {
        Ok(format!("coupon_{percent_off}_{}", Uuid::new_v4().simple()))
    }

    async fn billing_portal_url(&self, customer: &CustomerId) -> Result<String, PaymentError> {
        Ok(format!("https://pay.example/portal/{}", customer.0))
    }
}

/// External scoring service stand-in: sessions complete on the first poll
/// with a canned report.
pub(crate) struct SimulatedScoringClient;

#[async_trait]
impl ExternalScoringClient for SimulatedScoringClient {
    async fn create_session(&self, candidate_code: &str) -> Result<String, ScoringClientError> {
        Ok(format!("ext-{}", candidate_code.to_ascii_lowercase()))
    }

    async fn fetch_session(
        &self,
        provider_session_id: &str,
    ) -> Result<SessionPoll, ScoringClientError> {
        Ok(SessionPoll {
            status: SessionStatus::Completed,
            report: Some(serde_json::json!({
                "session": provider_session_id,
                "overall_score": 74,
                "assessment": "strong evidence base with room on press coverage"
            })),
        })
    }
}
