//! Evidence scoring: criterion configuration, the scoring engine, the
//! classification boundary, and the evidence upload/review service.

pub mod classifier;
pub mod criteria;
pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use classifier::{
    sanitize, ClassificationRequest, ClassifierError, DocumentClassifier, HttpClassifier,
    RawClassification, TieredClassifier,
};
pub use criteria::{CriterionKey, CriterionSpec, CRITERIA, FALLBACK_CRITERION};
pub use domain::{
    CandidateId, CandidateProfile, Classification, Confidence, CriterionAssessment, DocumentId,
    EvidenceDocument, EvidenceSummary, QualificationBands, QualificationStatus,
    VerificationStatus,
};
pub use engine::ScoringEngine;
pub use repository::{CandidateRepository, DocumentStatusView, EvidenceRepository};
pub use router::scoring_router;
pub use service::{EvidenceService, NewCandidate, NewEvidence, ReviewDecision, ScoreView};
