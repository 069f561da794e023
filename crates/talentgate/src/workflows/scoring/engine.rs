use super::criteria::CRITERIA;
use super::domain::{
    CriterionAssessment, EvidenceDocument, EvidenceSummary, QualificationBands, VerificationStatus,
};

/// Stateless aggregator turning a candidate's verified documents into an
/// evidence summary.
///
/// A pure function of the verified-document set: per-criterion sums are
/// clamped at the criterion cap (extra evidence saturates silently), the
/// overall score is clamped at 100 independently of the sum of caps, and no
/// timestamps enter the output, so recomputation is idempotent.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    bands: QualificationBands,
}

impl ScoringEngine {
    pub fn new(bands: QualificationBands) -> Self {
        Self { bands }
    }

    pub fn assess(&self, documents: &[EvidenceDocument]) -> EvidenceSummary {
        let mut criteria = Vec::with_capacity(CRITERIA.len());
        let mut criteria_met = Vec::new();
        let mut total: u32 = 0;

        for spec in CRITERIA.iter() {
            let contributions: Vec<&EvidenceDocument> = documents
                .iter()
                .filter(|document| {
                    document.status == VerificationStatus::Verified
                        && document.criterion == Some(spec.key)
                })
                .collect();

            let raw: u32 = contributions
                .iter()
                .map(|document| document.score_impact as u32)
                .sum();
            let score = raw.min(spec.max_score as u32) as u8;
            let met = score >= spec.threshold;
            total += score as u32;

            if met {
                criteria_met.push(spec.key);
            }

            let evidence_count = contributions.len();
            let covered = evidence_count.min(spec.examples.len());
            let (satisfied_examples, needed_examples) = if met {
                (spec.examples[..covered].to_vec(), Vec::new())
            } else {
                (
                    spec.examples[..covered].to_vec(),
                    spec.examples[covered..].to_vec(),
                )
            };

            criteria.push(CriterionAssessment {
                key: spec.key,
                display_name: spec.display_name,
                score,
                max_score: spec.max_score,
                threshold: spec.threshold,
                met,
                evidence_count,
                satisfied_examples,
                needed_examples,
            });
        }

        let overall_score = total.min(100) as u8;

        EvidenceSummary {
            criteria,
            overall_score,
            qualification: self.bands.status(overall_score),
            criteria_met,
        }
    }
}
