use serde::Serialize;

use crate::storage::RepositoryError;

use super::domain::{
    CandidateId, CandidateProfile, DocumentId, EvidenceDocument, EvidenceSummary,
};

/// Storage abstraction over candidate profiles.
///
/// `update_summary` is a single-row write of the derived score fields; the
/// store is assumed to apply it atomically.
pub trait CandidateRepository: Send + Sync {
    fn insert(&self, profile: CandidateProfile) -> Result<CandidateProfile, RepositoryError>;
    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateProfile>, RepositoryError>;
    fn update_summary(
        &self,
        id: &CandidateId,
        summary: &EvidenceSummary,
    ) -> Result<(), RepositoryError>;
}

/// Storage abstraction over evidence documents.
pub trait EvidenceRepository: Send + Sync {
    fn insert(&self, document: EvidenceDocument) -> Result<EvidenceDocument, RepositoryError>;
    fn fetch(&self, id: &DocumentId) -> Result<Option<EvidenceDocument>, RepositoryError>;
    fn update(&self, document: EvidenceDocument) -> Result<(), RepositoryError>;
    fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError>;
    fn for_candidate(
        &self,
        candidate: &CandidateId,
    ) -> Result<Vec<EvidenceDocument>, RepositoryError>;
}

/// Sanitized representation of a document's exposed state.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatusView {
    pub document_id: DocumentId,
    pub title: String,
    pub status: &'static str,
    pub criterion: Option<&'static str>,
    pub score_impact: u8,
}

impl DocumentStatusView {
    pub fn from_document(document: &EvidenceDocument) -> Self {
        Self {
            document_id: document.id,
            title: document.title.clone(),
            status: document.status.label(),
            criterion: document.criterion.map(|key| key.key()),
            score_impact: document.score_impact,
        }
    }
}
