use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::audit::{ActivityEntry, ActivityLog};
use crate::context::{RequestContext, Role, UserId};
use crate::error::AppError;
use crate::workflows::scoring::{CandidateId, CandidateRepository};

use super::domain::{
    CommitmentLevel, EmployerId, EngagementTerms, InterestLetter, LetterId, LetterStatus,
    SignatureStatus,
};
use super::repository::{LetterRepository, Notification, Notifier, Recipient};
use super::signature::{
    verify_signature, SignatureProvider, SignatureWebhook, SigningRequest,
};
use super::transitions::{self, LetterEvent, SideEffect, TransitionError};

impl From<TransitionError> for AppError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::InvalidState { .. } => AppError::InvalidState(value.to_string()),
            TransitionError::MissingFields(_) => AppError::InvalidInput(value.to_string()),
            TransitionError::MissingSignature => AppError::InvalidState(value.to_string()),
        }
    }
}

/// Employer's draft payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLetter {
    pub candidate_id: CandidateId,
    pub job_posting_id: Option<Uuid>,
    pub job_title: String,
    pub duties: String,
    pub justification: String,
    pub commitment: CommitmentLevel,
    #[serde(default)]
    pub terms: EngagementTerms,
}

/// Signer the employer nominates for the signature sub-flow.
#[derive(Debug, Clone, Deserialize)]
pub struct SignerDetails {
    pub email: String,
    pub name: String,
}

/// Letter state as exposed to API callers. Candidate contact details appear
/// only after the forward transition has revealed them, and only to the
/// employer side.
#[derive(Debug, Clone, Serialize)]
pub struct LetterView {
    pub letter_id: LetterId,
    pub candidate_code: String,
    pub status: &'static str,
    pub signature_status: &'static str,
    pub commitment: &'static str,
    pub job_title: String,
    pub contact_revealed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Acknowledgement returned to the signature provider. `processed` is
/// diagnostic only; the HTTP status is success either way.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub processed: bool,
}

impl WebhookAck {
    fn handled() -> Self {
        Self { processed: true }
    }

    fn ignored() -> Self {
        Self { processed: false }
    }
}

/// Service composing the letter store, candidate directory, notification
/// sink, audit trail, and the e-signature provider boundary.
pub struct LetterService<R, C, N, L> {
    letters: Arc<R>,
    candidates: Arc<C>,
    notifier: Arc<N>,
    activity: Arc<L>,
    signatures: Arc<dyn SignatureProvider>,
    webhook_secret: String,
}

impl<R, C, N, L> LetterService<R, C, N, L>
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    pub fn new(
        letters: Arc<R>,
        candidates: Arc<C>,
        notifier: Arc<N>,
        activity: Arc<L>,
        signatures: Arc<dyn SignatureProvider>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            letters,
            candidates,
            notifier,
            activity,
            signatures,
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Open a draft letter towards one candidate.
    pub fn create_draft(
        &self,
        ctx: &RequestContext,
        details: NewLetter,
    ) -> Result<InterestLetter, AppError> {
        if ctx.role != Role::Employer {
            return Err(AppError::Forbidden(
                "only employer accounts can open interest letters".to_string(),
            ));
        }
        self.candidates
            .fetch(&details.candidate_id)?
            .ok_or_else(|| AppError::NotFound(format!("candidate {}", details.candidate_id.0)))?;

        let letter = InterestLetter {
            id: LetterId::generate(),
            employer_id: EmployerId(ctx.user_id.0),
            candidate_id: details.candidate_id,
            job_posting_id: details.job_posting_id,
            job_title: details.job_title,
            duties: details.duties,
            justification: details.justification,
            commitment: details.commitment,
            terms: details.terms,
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
        };

        let stored = self.letters.insert(letter)?;
        self.record(
            ActivityEntry::new(Some(ctx.user_id), "letter_drafted", stored.id.0.to_string())
                .with_detail("candidate", stored.candidate_id.0.to_string()),
        );
        Ok(stored)
    }

    /// Employer submits a draft for administrative review. Admin
    /// notification is best-effort and never blocks the transition.
    pub fn submit(&self, ctx: &RequestContext, letter_id: LetterId) -> Result<LetterView, AppError> {
        let letter = self.fetch(&letter_id)?;
        self.require_employer_access(ctx, &letter)?;
        self.transition(ctx, &letter, LetterEvent::Submit)
    }

    /// Admin approval: the letter becomes `sent` in the same step and the
    /// candidate gets a notification record.
    pub fn approve(&self, ctx: &RequestContext, letter_id: LetterId) -> Result<LetterView, AppError> {
        ctx.require_admin()?;
        let letter = self.fetch(&letter_id)?;
        self.transition(ctx, &letter, LetterEvent::Approve)
    }

    pub fn reject(
        &self,
        ctx: &RequestContext,
        letter_id: LetterId,
        reason: String,
    ) -> Result<LetterView, AppError> {
        ctx.require_admin()?;
        if reason.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "a rejection reason is required".to_string(),
            ));
        }
        let letter = self.fetch(&letter_id)?;
        self.transition(ctx, &letter, LetterEvent::Reject { reason })
    }

    /// Ask the provider to collect a signature on a sent letter.
    ///
    /// The provider call happens before any mutation: an upstream failure
    /// surfaces as `Upstream` and leaves the letter untouched.
    pub async fn request_signature(
        &self,
        ctx: &RequestContext,
        letter_id: LetterId,
        signer: SignerDetails,
    ) -> Result<LetterView, AppError> {
        let letter = self.fetch(&letter_id)?;
        self.require_employer_access(ctx, &letter)?;
        if !letter.can_request_signature() {
            return Err(AppError::InvalidState(format!(
                "signature collection cannot start while the letter is {}/{}",
                letter.status.label(),
                letter.signature_status.label()
            )));
        }
        if signer.email.trim().is_empty() {
            return Err(AppError::InvalidInput("signer email is required".to_string()));
        }

        let request = SigningRequest {
            letter_id: letter.id,
            signer_email: signer.email,
            signer_name: signer.name,
            subject: format!("Interest letter: {}", letter.job_title),
            message: "Please review and sign the attached interest letter.".to_string(),
        };
        let document = self
            .signatures
            .create_signing_request(&request)
            .await
            .map_err(|err| AppError::Upstream(err.to_string()))?;

        self.transition(
            ctx,
            &letter,
            LetterEvent::SignatureRequested {
                provider_document_id: document.provider_document_id,
            },
        )
    }

    /// Ingest one provider webhook delivery.
    ///
    /// Authentication failures are rejected; past that point every internal
    /// failure is logged and still acknowledged, so the provider never
    /// enters a retry storm over our own outages.
    pub fn handle_webhook(
        &self,
        raw: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookAck, AppError> {
        let header = signature_header.ok_or(AppError::Unauthorized)?;
        if !verify_signature(raw, header, self.webhook_secret.as_bytes()) {
            return Err(AppError::Unauthorized);
        }

        let received_at = Utc::now();
        // Verbatim audit record first, so operators can replay anything the
        // steps below drop.
        self.record(
            ActivityEntry::new(None, "signature_webhook", "signature-provider")
                .with_detail("payload", String::from_utf8_lossy(raw).to_string()),
        );

        let payload: SignatureWebhook = match serde_json::from_slice(raw) {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, "undecodable signature webhook");
                return Ok(WebhookAck::ignored());
            }
        };

        tracing::info!(
            event_type = %payload.event_type,
            document = %payload.document_id,
            signer = payload.signer_email.as_deref().unwrap_or("-"),
            signer_name = payload.signer_name.as_deref().unwrap_or("-"),
            "signature webhook received"
        );

        let Some(event) = payload.event(received_at) else {
            warn!(event_type = %payload.event_type, "unknown signature event type, ignoring");
            return Ok(WebhookAck::ignored());
        };

        let letter = match self.letters.find_by_provider_document(&payload.document_id) {
            Ok(Some(letter)) => letter,
            Ok(None) => {
                warn!(document_id = %payload.document_id, "webhook for unknown envelope");
                return Ok(WebhookAck::ignored());
            }
            Err(err) => {
                error!(error = %err, "letter lookup failed during webhook");
                return Ok(WebhookAck::ignored());
            }
        };

        match transitions::apply(&letter, LetterEvent::Signature(event), received_at) {
            Ok(transition) => {
                if let Err(err) = self.letters.update(transition.letter.clone()) {
                    error!(error = %err, "persisting webhook transition failed");
                    return Ok(WebhookAck::ignored());
                }
                self.run_effects(None, &transition.letter, transition.effects);
                Ok(WebhookAck::handled())
            }
            Err(err) => {
                warn!(error = %err, letter = %letter.id.0, "webhook event ignored in current state");
                Ok(WebhookAck::ignored())
            }
        }
    }

    /// Admin picks a signed letter up for final review.
    pub fn begin_admin_review(
        &self,
        ctx: &RequestContext,
        letter_id: LetterId,
    ) -> Result<LetterView, AppError> {
        ctx.require_admin()?;
        let letter = self.fetch(&letter_id)?;
        self.transition(ctx, &letter, LetterEvent::BeginAdminReview)
    }

    /// Forward the signed copy to the employer, revealing candidate contact
    /// details.
    pub fn forward(&self, ctx: &RequestContext, letter_id: LetterId) -> Result<LetterView, AppError> {
        ctx.require_admin()?;
        let letter = self.fetch(&letter_id)?;
        self.transition(ctx, &letter, LetterEvent::Forward)
    }

    /// Current letter state for an involved party.
    pub fn view(&self, ctx: &RequestContext, letter_id: LetterId) -> Result<LetterView, AppError> {
        let letter = self.fetch(&letter_id)?;
        let involved = ctx.is_admin()
            || ctx.acts_as(Role::Employer, letter.employer_id.0)
            || ctx.acts_as(Role::Candidate, letter.candidate_id.0);
        if !involved {
            return Err(AppError::Forbidden(
                "letter belongs to another employer".to_string(),
            ));
        }
        self.view_for(ctx, &letter)
    }

    /// Admin review queue, oldest submissions first.
    pub fn pending_review(
        &self,
        ctx: &RequestContext,
        limit: usize,
    ) -> Result<Vec<LetterView>, AppError> {
        ctx.require_admin()?;
        let letters = self.letters.pending_review(limit)?;
        letters
            .iter()
            .map(|letter| self.view_for(ctx, letter))
            .collect()
    }

    fn fetch(&self, letter_id: &LetterId) -> Result<InterestLetter, AppError> {
        self.letters
            .fetch(letter_id)?
            .ok_or_else(|| AppError::NotFound(format!("letter {}", letter_id.0)))
    }

    fn require_employer_access(
        &self,
        ctx: &RequestContext,
        letter: &InterestLetter,
    ) -> Result<(), AppError> {
        if ctx.is_admin() || ctx.acts_as(Role::Employer, letter.employer_id.0) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "letter belongs to another employer".to_string(),
            ))
        }
    }

    /// Validate, persist, then run the side-effect intents.
    fn transition(
        &self,
        ctx: &RequestContext,
        letter: &InterestLetter,
        event: LetterEvent,
    ) -> Result<LetterView, AppError> {
        let transition = transitions::apply(letter, event, Utc::now())?;
        self.letters.update(transition.letter.clone())?;
        self.run_effects(Some(ctx.user_id), &transition.letter, transition.effects);
        self.view_for(ctx, &transition.letter)
    }

    /// Execute effect intents after commit. Every effect is independent and
    /// best-effort; failures are logged, never propagated.
    fn run_effects(
        &self,
        actor: Option<UserId>,
        letter: &InterestLetter,
        effects: Vec<SideEffect>,
    ) {
        for effect in effects {
            match effect {
                SideEffect::NotifyAdmins { template } => {
                    self.deliver(letter, Recipient::Admins, template, BTreeMap::new());
                }
                SideEffect::NotifyCandidate { template } => {
                    self.deliver(
                        letter,
                        Recipient::Candidate(letter.candidate_id),
                        template,
                        BTreeMap::new(),
                    );
                }
                SideEffect::NotifyEmployer {
                    template,
                    include_contact,
                } => {
                    let mut details = BTreeMap::new();
                    if include_contact {
                        match self.candidates.fetch(&letter.candidate_id) {
                            Ok(Some(profile)) => {
                                details.insert(
                                    "candidate_name".to_string(),
                                    profile.display_name.clone(),
                                );
                                details.insert(
                                    "candidate_contact".to_string(),
                                    profile.contact_email.clone(),
                                );
                            }
                            other => {
                                warn!(
                                    letter = %letter.id.0,
                                    outcome = ?other.err(),
                                    "candidate contact unavailable for forward notification"
                                );
                            }
                        }
                    }
                    self.deliver(letter, Recipient::Employer(letter.employer_id), template, details);
                }
                SideEffect::RecordActivity { action } => {
                    self.record(
                        ActivityEntry::new(actor, action, letter.id.0.to_string())
                            .with_detail("status", letter.status.label().to_string())
                            .with_detail(
                                "signature_status",
                                letter.signature_status.label().to_string(),
                            ),
                    );
                }
            }
        }
    }

    fn deliver(
        &self,
        letter: &InterestLetter,
        recipient: Recipient,
        template: &'static str,
        mut details: BTreeMap<String, String>,
    ) {
        details.insert("letter_id".to_string(), letter.id.0.to_string());
        details.insert("job_title".to_string(), letter.job_title.clone());
        let notification = Notification {
            recipient,
            template: template.to_string(),
            details,
        };
        if let Err(err) = self.notifier.deliver(notification) {
            warn!(error = %err, template, "notification delivery failed");
        }
    }

    fn record(&self, entry: ActivityEntry) {
        if let Err(err) = self.activity.record(entry) {
            warn!(error = %err, "activity record failed");
        }
    }

    fn view_for(
        &self,
        ctx: &RequestContext,
        letter: &InterestLetter,
    ) -> Result<LetterView, AppError> {
        let profile = self.candidates.fetch(&letter.candidate_id)?;
        let candidate_code = profile
            .as_ref()
            .map(|profile| profile.candidate_code.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let employer_side =
            ctx.is_admin() || ctx.acts_as(Role::Employer, letter.employer_id.0);
        let candidate_contact = match (&profile, letter.contact_revealed_at, employer_side) {
            (Some(profile), Some(_), true) => Some(profile.contact_email.clone()),
            _ => None,
        };

        Ok(LetterView {
            letter_id: letter.id,
            candidate_code,
            status: letter.status.label(),
            signature_status: letter.signature_status.label(),
            commitment: letter.commitment.label(),
            job_title: letter.job_title.clone(),
            contact_revealed_at: letter.contact_revealed_at,
            candidate_contact,
            rejection_reason: letter.rejection_reason.clone(),
        })
    }
}
