use serde::{Deserialize, Serialize};

/// The eight O-1 evidentiary criteria a document can count toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKey {
    Awards,
    Membership,
    Press,
    Judging,
    OriginalContribution,
    ScholarlyArticles,
    CriticalEmployment,
    HighRemuneration,
}

impl CriterionKey {
    pub const fn key(self) -> &'static str {
        match self {
            CriterionKey::Awards => "awards",
            CriterionKey::Membership => "membership",
            CriterionKey::Press => "press",
            CriterionKey::Judging => "judging",
            CriterionKey::OriginalContribution => "original_contribution",
            CriterionKey::ScholarlyArticles => "scholarly_articles",
            CriterionKey::CriticalEmployment => "critical_employment",
            CriterionKey::HighRemuneration => "high_remuneration",
        }
    }

    /// Parse a criterion from its wire key. Returns `None` for anything
    /// outside the fixed eight so callers can substitute the fallback.
    pub fn from_key(value: &str) -> Option<Self> {
        CRITERIA
            .iter()
            .map(|spec| spec.key)
            .find(|key| key.key() == value.trim().to_ascii_lowercase())
    }

    pub fn spec(self) -> &'static CriterionSpec {
        CRITERIA
            .iter()
            .find(|spec| spec.key == self)
            .expect("every criterion key has a table entry")
    }
}

/// Declarative description of one criterion: scoring cap, met threshold, and
/// the illustrative evidence examples surfaced to candidates.
#[derive(Debug, Clone)]
pub struct CriterionSpec {
    pub key: CriterionKey,
    pub display_name: &'static str,
    pub max_score: u8,
    pub threshold: u8,
    pub examples: &'static [&'static str],
}

/// The single source of truth for criterion configuration.
///
/// Declaration order is significant: it fixes the ordering of evidence
/// summaries and of the met-criteria list, so this stays an ordered array
/// rather than a map.
pub static CRITERIA: [CriterionSpec; 8] = [
    CriterionSpec {
        key: CriterionKey::Awards,
        display_name: "Nationally or internationally recognized awards",
        max_score: 20,
        threshold: 12,
        examples: &[
            "Industry award or medal with national reach",
            "Competitive fellowship or grant won on merit",
            "Finalist placement in a recognized international competition",
        ],
    },
    CriterionSpec {
        key: CriterionKey::Membership,
        display_name: "Membership in associations requiring outstanding achievement",
        max_score: 10,
        threshold: 6,
        examples: &[
            "Invited membership in a selective professional body",
            "Elected fellow status in a learned society",
        ],
    },
    CriterionSpec {
        key: CriterionKey::Press,
        display_name: "Published material about the candidate",
        max_score: 15,
        threshold: 10,
        examples: &[
            "Profile in major trade or national media",
            "Feature interview about the candidate's work",
            "Substantial coverage of a project the candidate led",
        ],
    },
    CriterionSpec {
        key: CriterionKey::Judging,
        display_name: "Judging the work of others in the field",
        max_score: 10,
        threshold: 6,
        examples: &[
            "Peer review for a recognized journal or conference",
            "Jury service for an industry competition",
        ],
    },
    CriterionSpec {
        key: CriterionKey::OriginalContribution,
        display_name: "Original contributions of major significance",
        max_score: 20,
        threshold: 12,
        examples: &[
            "Patent or publication adopted across the industry",
            "Open-source work in widespread production use",
            "Technique or finding cited as foundational by peers",
        ],
    },
    CriterionSpec {
        key: CriterionKey::ScholarlyArticles,
        display_name: "Authorship of scholarly articles",
        max_score: 15,
        threshold: 8,
        examples: &[
            "Peer-reviewed article in a professional journal",
            "Invited chapter in an academic volume",
        ],
    },
    CriterionSpec {
        key: CriterionKey::CriticalEmployment,
        display_name: "Employment in a critical or essential capacity",
        max_score: 15,
        threshold: 8,
        examples: &[
            "Lead role at an organization with a distinguished reputation",
            "Letter establishing the candidate's role was critical to outcomes",
        ],
    },
    CriterionSpec {
        key: CriterionKey::HighRemuneration,
        display_name: "High salary or remuneration relative to the field",
        max_score: 10,
        threshold: 6,
        examples: &[
            "Compensation evidence placing the candidate near the top of the field",
            "Offer letters or contracts demonstrating premium rates",
        ],
    },
];

/// Criterion assigned when classification returns something outside the
/// fixed eight; paired with low confidence and a minimal score impact.
pub const FALLBACK_CRITERION: CriterionKey = CriterionKey::Press;

/// Score impact attached to fallback classifications.
pub const FALLBACK_SCORE_IMPACT: u8 = 1;
