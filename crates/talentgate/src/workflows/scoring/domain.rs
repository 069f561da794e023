use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::criteria::CriterionKey;

/// Identifier wrapper for candidate profiles. Matches the account id issued
/// by the hosted auth provider at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub Uuid);

/// Identifier wrapper for uploaded evidence documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Verification lifecycle of an evidence document. Only `Verified` documents
/// contribute to scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    NeedsReview,
    Rejected,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::NeedsReview => "needs_review",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

/// Classifier confidence attached to an advisory classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

/// Sanitized classification result: criterion always one of the fixed eight,
/// score impact already clamped to the criterion cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub criterion: CriterionKey,
    pub confidence: Confidence,
    pub score_impact: u8,
    pub rationale: String,
}

/// An uploaded evidence artifact owned by exactly one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceDocument {
    pub id: DocumentId,
    pub candidate_id: CandidateId,
    pub title: String,
    pub description: Option<String>,
    pub content_type: String,
    /// Object-storage key for the raw upload.
    pub content_ref: String,
    pub extracted_text: String,
    pub criterion: Option<CriterionKey>,
    pub score_impact: u8,
    pub status: VerificationStatus,
    pub classification: Option<Classification>,
    pub uploaded_at: DateTime<Utc>,
}

/// Derived qualification label from the overall score bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationStatus {
    Developing,
    Borderline,
    Strong,
}

impl QualificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            QualificationStatus::Developing => "developing",
            QualificationStatus::Borderline => "borderline",
            QualificationStatus::Strong => "strong",
        }
    }
}

/// Score-band boundaries for the qualification label. Configuration, not
/// engine logic: the engine only calls `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationBands {
    pub strong_minimum: u8,
    pub borderline_minimum: u8,
}

impl QualificationBands {
    pub fn status(&self, score: u8) -> QualificationStatus {
        if score >= self.strong_minimum {
            QualificationStatus::Strong
        } else if score >= self.borderline_minimum {
            QualificationStatus::Borderline
        } else {
            QualificationStatus::Developing
        }
    }
}

impl Default for QualificationBands {
    fn default() -> Self {
        Self {
            strong_minimum: 70,
            borderline_minimum: 40,
        }
    }
}

/// Per-criterion snapshot inside an evidence summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriterionAssessment {
    pub key: CriterionKey,
    pub display_name: &'static str,
    pub score: u8,
    pub max_score: u8,
    pub threshold: u8,
    pub met: bool,
    pub evidence_count: usize,
    pub satisfied_examples: Vec<&'static str>,
    pub needed_examples: Vec<&'static str>,
}

/// Full scoring result for a candidate: one assessment per criterion in
/// table order, the clamped overall score, and the derived status.
///
/// Deliberately timestamp-free so that recomputation over an unchanged
/// document set yields an identical value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvidenceSummary {
    pub criteria: Vec<CriterionAssessment>,
    pub overall_score: u8,
    pub qualification: QualificationStatus,
    pub criteria_met: Vec<CriterionKey>,
}

impl EvidenceSummary {
    /// Summary for a candidate with no verified evidence yet.
    pub fn empty() -> Self {
        super::engine::ScoringEngine::default().assess(&[])
    }
}

/// Candidate profile record. The score fields are derived and mutated only
/// by the scoring engine in response to evidence changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateProfile {
    pub id: CandidateId,
    /// Display code shown to employers in place of identity, e.g. `TAL-2048`.
    pub candidate_code: String,
    pub display_name: String,
    pub contact_email: String,
    pub field_of_expertise: String,
    pub summary: EvidenceSummary,
    pub created_at: DateTime<Utc>,
}

impl CandidateProfile {
    pub fn overall_score(&self) -> u8 {
        self.summary.overall_score
    }

    pub fn qualification(&self) -> QualificationStatus {
        self.summary.qualification
    }
}
