use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audit::{ActivityEntry, ActivityLog};
use crate::context::{RequestContext, Role};
use crate::error::AppError;

use super::classifier::{offline_fallback, sanitize, ClassificationRequest, DocumentClassifier};
use super::criteria::CriterionKey;
use super::domain::{
    CandidateId, CandidateProfile, DocumentId, EvidenceDocument, EvidenceSummary,
    VerificationStatus,
};
use super::engine::ScoringEngine;
use super::repository::{CandidateRepository, DocumentStatusView, EvidenceRepository};

/// Candidate signup payload. The profile id is the authenticated account id.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCandidate {
    pub display_name: String,
    pub contact_email: String,
    pub field_of_expertise: String,
}

/// Inbound evidence upload, already staged in object storage by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvidence {
    pub title: String,
    pub description: Option<String>,
    pub content_type: String,
    pub content_ref: String,
    pub extracted_text: String,
}

/// Administrative review decision for a pending document.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Mark verified, optionally overriding the advisory classification.
    Verify {
        criterion: Option<CriterionKey>,
        score_impact: Option<u8>,
    },
    NeedsReview,
    Reject,
}

/// Candidate score snapshot returned to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreView {
    pub candidate_id: CandidateId,
    pub candidate_code: String,
    pub overall_score: u8,
    pub qualification: &'static str,
    pub criteria_met: Vec<&'static str>,
    pub summary: EvidenceSummary,
}

impl ScoreView {
    fn new(profile: &CandidateProfile, summary: EvidenceSummary) -> Self {
        Self {
            candidate_id: profile.id,
            candidate_code: profile.candidate_code.clone(),
            overall_score: summary.overall_score,
            qualification: summary.qualification.label(),
            criteria_met: summary.criteria_met.iter().map(|key| key.key()).collect(),
            summary,
        }
    }
}

/// Service composing the repositories, classification boundary, and scoring
/// engine. All operations take the request context explicitly.
pub struct EvidenceService<C, E, L> {
    candidates: Arc<C>,
    evidence: Arc<E>,
    activity: Arc<L>,
    classifier: Arc<dyn DocumentClassifier>,
    engine: ScoringEngine,
}

impl<C, E, L> EvidenceService<C, E, L>
where
    C: CandidateRepository + 'static,
    E: EvidenceRepository + 'static,
    L: ActivityLog + 'static,
{
    pub fn new(
        candidates: Arc<C>,
        evidence: Arc<E>,
        activity: Arc<L>,
        classifier: Arc<dyn DocumentClassifier>,
        engine: ScoringEngine,
    ) -> Self {
        Self {
            candidates,
            evidence,
            activity,
            classifier,
            engine,
        }
    }

    /// Create the candidate profile after auth-provider signup.
    pub fn register_candidate(
        &self,
        ctx: &RequestContext,
        details: NewCandidate,
    ) -> Result<CandidateProfile, AppError> {
        if ctx.role != Role::Candidate {
            return Err(AppError::Forbidden(
                "only candidate accounts can create a talent profile".to_string(),
            ));
        }
        if details.display_name.trim().is_empty() || details.contact_email.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "display name and contact email are required".to_string(),
            ));
        }

        let id = CandidateId(ctx.user_id.0);
        let profile = CandidateProfile {
            id,
            candidate_code: candidate_code(&id),
            display_name: details.display_name.trim().to_string(),
            contact_email: details.contact_email.trim().to_string(),
            field_of_expertise: details.field_of_expertise.trim().to_string(),
            summary: EvidenceSummary::empty(),
            created_at: Utc::now(),
        };

        let stored = self.candidates.insert(profile)?;
        self.record(
            ActivityEntry::new(Some(ctx.user_id), "candidate_registered", stored.candidate_code.clone()),
        );
        Ok(stored)
    }

    /// Store a new evidence document with an advisory classification.
    ///
    /// Classification is consultative only: provider failures degrade to the
    /// fallback category and never fail the upload. The document lands as
    /// `pending`; scoring ignores it until an admin verifies it.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        candidate_id: CandidateId,
        upload: NewEvidence,
    ) -> Result<EvidenceDocument, AppError> {
        self.require_candidate_access(ctx, &candidate_id)?;
        validate_upload(&upload)?;

        self.candidates
            .fetch(&candidate_id)?
            .ok_or_else(|| AppError::NotFound(format!("candidate {}", candidate_id.0)))?;

        let request = ClassificationRequest {
            text: upload.extracted_text.clone(),
            title: Some(upload.title.clone()),
            description: upload.description.clone(),
        };
        let classification = match self.classifier.classify(&request).await {
            Ok(raw) => sanitize(&raw),
            Err(err) => {
                warn!(error = %err, "all classification providers failed");
                offline_fallback()
            }
        };

        let document = EvidenceDocument {
            id: DocumentId::generate(),
            candidate_id,
            title: upload.title.trim().to_string(),
            description: upload.description,
            content_type: upload.content_type,
            content_ref: upload.content_ref,
            extracted_text: upload.extracted_text,
            criterion: Some(classification.criterion),
            score_impact: classification.score_impact,
            status: VerificationStatus::Pending,
            classification: Some(classification),
            uploaded_at: Utc::now(),
        };

        let stored = self.evidence.insert(document)?;
        self.record(
            ActivityEntry::new(Some(ctx.user_id), "evidence_uploaded", stored.id.0.to_string())
                .with_detail("candidate", candidate_id.0.to_string())
                .with_detail("title", stored.title.clone()),
        );
        Ok(stored)
    }

    /// Apply an administrative review decision and rescore the owner when the
    /// verified set changes.
    pub fn review(
        &self,
        ctx: &RequestContext,
        document_id: DocumentId,
        decision: ReviewDecision,
    ) -> Result<DocumentStatusView, AppError> {
        ctx.require_admin()?;

        let mut document = self
            .evidence
            .fetch(&document_id)?
            .ok_or_else(|| AppError::NotFound(format!("document {}", document_id.0)))?;
        let was_verified = document.status == VerificationStatus::Verified;

        match decision {
            ReviewDecision::Verify {
                criterion,
                score_impact,
            } => {
                let criterion = criterion.or(document.criterion).ok_or_else(|| {
                    AppError::InvalidInput(
                        "document has no criterion; supply one to verify".to_string(),
                    )
                })?;
                let cap = criterion.spec().max_score;
                let impact = score_impact.unwrap_or(document.score_impact).min(cap);
                document.criterion = Some(criterion);
                document.score_impact = impact;
                document.status = VerificationStatus::Verified;
            }
            ReviewDecision::NeedsReview => document.status = VerificationStatus::NeedsReview,
            ReviewDecision::Reject => document.status = VerificationStatus::Rejected,
        }

        let now_verified = document.status == VerificationStatus::Verified;
        let owner = document.candidate_id;
        self.evidence.update(document.clone())?;

        if was_verified || now_verified {
            self.recompute(owner)?;
        }

        self.record(
            ActivityEntry::new(Some(ctx.user_id), "evidence_reviewed", document.id.0.to_string())
                .with_detail("status", document.status.label().to_string()),
        );
        Ok(DocumentStatusView::from_document(&document))
    }

    /// Remove a document and rescore its owner without it.
    pub fn delete(&self, ctx: &RequestContext, document_id: DocumentId) -> Result<(), AppError> {
        let document = self
            .evidence
            .fetch(&document_id)?
            .ok_or_else(|| AppError::NotFound(format!("document {}", document_id.0)))?;
        self.require_candidate_access(ctx, &document.candidate_id)?;

        self.evidence.delete(&document_id)?;
        self.recompute(document.candidate_id)?;

        self.record(
            ActivityEntry::new(Some(ctx.user_id), "evidence_deleted", document_id.0.to_string())
                .with_detail("candidate", document.candidate_id.0.to_string()),
        );
        Ok(())
    }

    /// Recompute the candidate's summary from the current verified set and
    /// persist it. Nothing is written when a read fails.
    pub fn recompute(&self, candidate_id: CandidateId) -> Result<EvidenceSummary, AppError> {
        self.candidates
            .fetch(&candidate_id)?
            .ok_or_else(|| AppError::NotFound(format!("candidate {}", candidate_id.0)))?;

        let documents = self.evidence.for_candidate(&candidate_id)?;
        let summary = self.engine.assess(&documents);
        self.candidates.update_summary(&candidate_id, &summary)?;
        Ok(summary)
    }

    /// Current score snapshot. Readable by the candidate, admins, and
    /// employers browsing talent; contact details are not part of the view.
    pub fn summary(
        &self,
        ctx: &RequestContext,
        candidate_id: CandidateId,
    ) -> Result<ScoreView, AppError> {
        let _ = ctx;
        let profile = self
            .candidates
            .fetch(&candidate_id)?
            .ok_or_else(|| AppError::NotFound(format!("candidate {}", candidate_id.0)))?;
        let summary = profile.summary.clone();
        Ok(ScoreView::new(&profile, summary))
    }

    /// Pending documents for the admin review queue.
    pub fn pending_documents(
        &self,
        ctx: &RequestContext,
        candidate_id: CandidateId,
    ) -> Result<Vec<DocumentStatusView>, AppError> {
        ctx.require_admin()?;
        let documents = self.evidence.for_candidate(&candidate_id)?;
        Ok(documents
            .iter()
            .filter(|document| document.status == VerificationStatus::Pending)
            .map(DocumentStatusView::from_document)
            .collect())
    }

    fn require_candidate_access(
        &self,
        ctx: &RequestContext,
        candidate_id: &CandidateId,
    ) -> Result<(), AppError> {
        if ctx.is_admin() || ctx.acts_as(Role::Candidate, candidate_id.0) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "evidence belongs to another candidate".to_string(),
            ))
        }
    }

    fn record(&self, entry: ActivityEntry) {
        if let Err(err) = self.activity.record(entry) {
            warn!(error = %err, "activity record failed");
        }
    }
}

fn candidate_code(id: &CandidateId) -> String {
    let raw = id.0.simple().to_string();
    format!("TAL-{}", raw[..8].to_ascii_uppercase())
}

fn validate_upload(upload: &NewEvidence) -> Result<(), AppError> {
    if upload.title.trim().is_empty() {
        return Err(AppError::InvalidInput("title is required".to_string()));
    }
    if upload.extracted_text.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "no extractable text in upload".to_string(),
        ));
    }

    let parsed: mime::Mime = upload
        .content_type
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("unparseable content type {}", upload.content_type)))?;
    let top = parsed.type_();
    if top == mime::APPLICATION || top == mime::TEXT || top == mime::IMAGE {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "unsupported content type {top}"
        )))
    }
}
