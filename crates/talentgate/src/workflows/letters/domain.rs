use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::scoring::CandidateId;

/// Identifier wrapper for interest letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LetterId(pub Uuid);

impl LetterId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Identifier wrapper for employer accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployerId(pub Uuid);

/// Primary review status of a letter. `Sent` is the externally visible
/// synonym for approved-and-delivered; approval and delivery happen in one
/// transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterStatus {
    Draft,
    PendingReview,
    Sent,
    Rejected,
}

impl LetterStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LetterStatus::Draft => "draft",
            LetterStatus::PendingReview => "pending_review",
            LetterStatus::Sent => "sent",
            LetterStatus::Rejected => "rejected",
        }
    }
}

/// E-signature sub-flow position, tracked independently of the primary
/// status once a letter is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    None,
    Requested,
    SentToSigner,
    Viewed,
    Signed,
    Declined,
    Expired,
    AdminReviewing,
    ForwardedToEmployer,
}

impl SignatureStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SignatureStatus::None => "none",
            SignatureStatus::Requested => "requested",
            SignatureStatus::SentToSigner => "sent_to_signer",
            SignatureStatus::Viewed => "viewed",
            SignatureStatus::Signed => "signed",
            SignatureStatus::Declined => "declined",
            SignatureStatus::Expired => "expired",
            SignatureStatus::AdminReviewing => "admin_reviewing",
            SignatureStatus::ForwardedToEmployer => "forwarded_to_employer",
        }
    }
}

/// How firm the employer's expressed interest is, from exploratory contact
/// up to an extended offer. Ordering is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentLevel {
    Exploratory,
    Evaluating,
    InterviewRequested,
    OfferIntended,
    OfferExtended,
}

impl CommitmentLevel {
    pub const fn label(self) -> &'static str {
        match self {
            CommitmentLevel::Exploratory => "exploratory",
            CommitmentLevel::Evaluating => "evaluating",
            CommitmentLevel::InterviewRequested => "interview_requested",
            CommitmentLevel::OfferIntended => "offer_intended",
            CommitmentLevel::OfferExtended => "offer_extended",
        }
    }
}

/// Compensation and engagement details attached to a letter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementTerms {
    pub annual_compensation_usd: Option<u32>,
    pub hours_per_week: Option<u8>,
    pub engagement_type: Option<String>,
}

/// An employer's expression of interest in one candidate.
///
/// Candidate contact details stay hidden from the employer until the forward
/// transition stamps `contact_revealed_at`; the timestamp is never unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestLetter {
    pub id: LetterId,
    pub employer_id: EmployerId,
    pub candidate_id: CandidateId,
    pub job_posting_id: Option<Uuid>,
    pub job_title: String,
    pub duties: String,
    pub justification: String,
    pub commitment: CommitmentLevel,
    pub terms: EngagementTerms,
    pub status: LetterStatus,
    pub signature_status: SignatureStatus,
    /// Envelope id issued by the signature provider for the outbound request.
    pub provider_document_id: Option<String>,
    /// Reference to the completed, signed document.
    pub signed_document_ref: Option<String>,
    pub signature_completed_at: Option<DateTime<Utc>>,
    pub contact_revealed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl InterestLetter {
    /// Required free-text fields are populated (submission precondition).
    pub fn has_required_fields(&self) -> bool {
        !self.job_title.trim().is_empty()
            && !self.duties.trim().is_empty()
            && !self.justification.trim().is_empty()
    }

    /// Signature collection can start once the letter is sent and no
    /// sub-flow is underway.
    pub fn can_request_signature(&self) -> bool {
        self.status == LetterStatus::Sent && self.signature_status == SignatureStatus::None
    }
}
