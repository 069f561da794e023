use super::common::*;
use crate::workflows::scoring::classifier::{
    sanitize, ClassificationRequest, DocumentClassifier, RawClassification, TieredClassifier,
};
use crate::workflows::scoring::criteria::{CriterionKey, FALLBACK_CRITERION};
use crate::workflows::scoring::domain::Confidence;

fn request() -> ClassificationRequest {
    ClassificationRequest {
        text: "Peer reviewed articles in a major journal".to_string(),
        title: Some("Publication record".to_string()),
        description: None,
    }
}

#[test]
fn unknown_category_is_replaced_by_the_fallback() {
    let raw = RawClassification {
        category: "citizenship".to_string(),
        confidence: "high".to_string(),
        score_impact: 12,
        rationale: "looks like an identity document".to_string(),
    };

    let classification = sanitize(&raw);
    assert_eq!(classification.criterion, FALLBACK_CRITERION);
    assert_eq!(classification.confidence, Confidence::Low);
    assert_eq!(classification.score_impact, 1);
}

#[test]
fn recognized_category_keeps_confidence_and_clamps_impact() {
    let raw = RawClassification {
        category: "scholarly_articles".to_string(),
        confidence: "medium".to_string(),
        score_impact: 99,
        rationale: "journal publication".to_string(),
    };

    let classification = sanitize(&raw);
    assert_eq!(classification.criterion, CriterionKey::ScholarlyArticles);
    assert_eq!(classification.confidence, Confidence::Medium);
    assert_eq!(
        classification.score_impact,
        CriterionKey::ScholarlyArticles.spec().max_score
    );
}

#[test]
fn negative_impact_and_unknown_confidence_degrade_safely() {
    let raw = RawClassification {
        category: "awards".to_string(),
        confidence: "certain".to_string(),
        score_impact: -5,
        rationale: "award letter".to_string(),
    };

    let classification = sanitize(&raw);
    assert_eq!(classification.criterion, CriterionKey::Awards);
    assert_eq!(classification.confidence, Confidence::Low);
    assert_eq!(classification.score_impact, 0);
}

#[tokio::test]
async fn tiered_classifier_falls_back_to_the_secondary_provider() {
    let classifier = TieredClassifier::new(
        DownClassifier,
        StubClassifier::returning("judging", "high", 5),
    );

    let raw = classifier.classify(&request()).await.expect("secondary answers");
    assert_eq!(raw.category, "judging");
    assert_eq!(raw.score_impact, 5);
}

#[tokio::test]
async fn tiered_classifier_propagates_total_failure() {
    let classifier = TieredClassifier::new(DownClassifier, DownClassifier);
    assert!(classifier.classify(&request()).await.is_err());
}
