use std::sync::Arc;

use uuid::Uuid;

use super::common::*;
use crate::context::{RequestContext, Role, UserId};
use crate::error::AppError;
use crate::workflows::letters::domain::{LetterStatus, SignatureStatus};
use crate::workflows::letters::repository::{LetterRepository, Recipient};
use crate::workflows::letters::service::LetterService;
use crate::workflows::scoring::domain::CandidateId;

#[test]
fn drafting_is_employer_only_and_needs_a_real_candidate() {
    let harness = build_harness(Arc::new(StubSignatureProvider));

    match harness
        .service
        .create_draft(&admin_ctx(), new_letter(harness.candidate.id))
    {
        Err(AppError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }

    match harness
        .service
        .create_draft(&employer_ctx(), new_letter(CandidateId(Uuid::new_v4())))
    {
        Err(AppError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }

    let letter = harness
        .service
        .create_draft(&employer_ctx(), new_letter(harness.candidate.id))
        .expect("draft created");
    assert_eq!(letter.status, LetterStatus::Draft);
    assert_eq!(letter.signature_status, SignatureStatus::None);
}

#[test]
fn submit_enforces_ownership_and_notifies_admins() {
    let harness = build_harness(Arc::new(StubSignatureProvider));
    let employer = employer_ctx();
    let letter = harness
        .service
        .create_draft(&employer, new_letter(harness.candidate.id))
        .expect("draft created");

    match harness.service.submit(&employer_ctx(), letter.id) {
        Err(AppError::Forbidden(_)) => {}
        other => panic!("expected forbidden for a different employer, got {other:?}"),
    }

    let view = harness
        .service
        .submit(&employer, letter.id)
        .expect("owner submits");
    assert_eq!(view.status, "pending_review");

    let messages = harness.notifier.messages();
    assert!(messages
        .iter()
        .any(|message| message.recipient == Recipient::Admins
            && message.template == "letter_submitted"));
}

#[test]
fn approval_is_single_shot_and_creates_a_candidate_notification() {
    let harness = build_harness(Arc::new(StubSignatureProvider));
    let employer = employer_ctx();
    let admin = admin_ctx();
    let letter = harness
        .service
        .create_draft(&employer, new_letter(harness.candidate.id))
        .expect("draft created");
    harness.service.submit(&employer, letter.id).expect("submitted");

    let view = harness.service.approve(&admin, letter.id).expect("approved");
    assert_eq!(view.status, "sent");

    let messages = harness.notifier.messages();
    assert!(messages
        .iter()
        .any(|message| message.recipient == Recipient::Candidate(harness.candidate.id)
            && message.template == "letter_received"));

    match harness.service.approve(&admin, letter.id) {
        Err(AppError::InvalidState(_)) => {}
        other => panic!("expected invalid state on second approval, got {other:?}"),
    }
}

#[test]
fn notifier_outages_never_block_approval() {
    let letters = Arc::new(MemoryLetters::default());
    let candidate = candidate_profile();
    let directory = MemoryDirectory::with_profile(candidate.clone());
    let activity = Arc::new(MemoryActivity::default());
    let service = LetterService::new(
        letters.clone(),
        directory,
        Arc::new(BrokenNotifier),
        activity,
        Arc::new(StubSignatureProvider),
        WEBHOOK_SECRET,
    );

    let employer = employer_ctx();
    let letter = service
        .create_draft(&employer, new_letter(candidate.id))
        .expect("draft created");
    service.submit(&employer, letter.id).expect("submitted");
    let view = service
        .approve(&admin_ctx(), letter.id)
        .expect("approval survives a dead notifier");
    assert_eq!(view.status, "sent");

    let stored = letters
        .fetch(&letter.id)
        .expect("fetch")
        .expect("letter present");
    assert_eq!(stored.status, LetterStatus::Sent);
}

#[tokio::test]
async fn signature_request_leaves_the_letter_untouched_on_provider_failure() {
    let harness = build_harness(Arc::new(DownSignatureProvider));
    let employer = employer_ctx();
    let admin = admin_ctx();
    let letter = harness
        .service
        .create_draft(&employer, new_letter(harness.candidate.id))
        .expect("draft created");
    harness.service.submit(&employer, letter.id).expect("submitted");
    harness.service.approve(&admin, letter.id).expect("approved");

    match harness
        .service
        .request_signature(&employer, letter.id, signer())
        .await
    {
        Err(AppError::Upstream(_)) => {}
        other => panic!("expected upstream failure, got {other:?}"),
    }

    let stored = harness
        .letters
        .fetch(&letter.id)
        .expect("fetch")
        .expect("letter present");
    assert_eq!(stored.signature_status, SignatureStatus::None);
    assert!(stored.provider_document_id.is_none());
}

#[tokio::test]
async fn signature_request_records_the_provider_envelope() {
    let harness = build_harness(Arc::new(StubSignatureProvider));
    let employer = employer_ctx();
    let admin = admin_ctx();
    let letter = harness
        .service
        .create_draft(&employer, new_letter(harness.candidate.id))
        .expect("draft created");
    harness.service.submit(&employer, letter.id).expect("submitted");
    harness.service.approve(&admin, letter.id).expect("approved");

    let view = harness
        .service
        .request_signature(&employer, letter.id, signer())
        .await
        .expect("signature requested");
    assert_eq!(view.signature_status, "requested");

    let stored = harness
        .letters
        .fetch(&letter.id)
        .expect("fetch")
        .expect("letter present");
    assert_eq!(stored.provider_document_id.as_deref(), Some("env-1234"));

    // A second request while one is in flight is refused before any
    // provider call.
    match harness
        .service
        .request_signature(&employer, letter.id, signer())
        .await
    {
        Err(AppError::InvalidState(_)) => {}
        other => panic!("expected invalid state, got {other:?}"),
    }
}

#[test]
fn forward_without_admin_review_fails_and_changes_nothing() {
    let harness = build_harness(Arc::new(StubSignatureProvider));
    let employer = employer_ctx();
    let admin = admin_ctx();
    let letter = harness
        .service
        .create_draft(&employer, new_letter(harness.candidate.id))
        .expect("draft created");
    harness.service.submit(&employer, letter.id).expect("submitted");
    harness.service.approve(&admin, letter.id).expect("approved");

    match harness.service.forward(&admin, letter.id) {
        Err(AppError::InvalidState(_)) => {}
        other => panic!("expected invalid state, got {other:?}"),
    }

    let stored = harness
        .letters
        .fetch(&letter.id)
        .expect("fetch")
        .expect("letter present");
    assert_eq!(stored.signature_status, SignatureStatus::None);
    assert!(stored.contact_revealed_at.is_none());
}

#[test]
fn contact_is_revealed_to_the_employer_only_after_forwarding() {
    let harness = build_harness(Arc::new(StubSignatureProvider));
    let employer = employer_ctx();
    let admin = admin_ctx();
    let letter = harness
        .service
        .create_draft(&employer, new_letter(harness.candidate.id))
        .expect("draft created");
    harness.service.submit(&employer, letter.id).expect("submitted");
    harness.service.approve(&admin, letter.id).expect("approved");

    let before = harness
        .service
        .view(&employer, letter.id)
        .expect("employer views");
    assert!(before.candidate_contact.is_none());

    // Simulate the signed state directly; the webhook tests cover the
    // provider-driven path.
    {
        let mut guard = harness.letters.records.lock().expect("mutex");
        let stored = guard.get_mut(&letter.id).expect("letter present");
        stored.signature_status = SignatureStatus::Signed;
        stored.signed_document_ref = Some("signed/env-1234.pdf".to_string());
    }

    harness
        .service
        .begin_admin_review(&admin, letter.id)
        .expect("review starts");
    let forwarded = harness.service.forward(&admin, letter.id).expect("forwarded");
    assert_eq!(forwarded.signature_status, "forwarded_to_employer");
    assert!(forwarded.contact_revealed_at.is_some());

    let employer_view = harness
        .service
        .view(&employer, letter.id)
        .expect("employer views");
    assert_eq!(
        employer_view.candidate_contact.as_deref(),
        Some("ada@example.com")
    );

    let candidate_ctx = RequestContext::new(UserId(harness.candidate.id.0), Role::Candidate);
    let candidate_view = harness
        .service
        .view(&candidate_ctx, letter.id)
        .expect("candidate views");
    assert!(candidate_view.candidate_contact.is_none());

    let messages = harness.notifier.messages();
    let forward_note = messages
        .iter()
        .find(|message| message.template == "signed_letter_forwarded")
        .expect("employer notified");
    assert_eq!(
        forward_note.details.get("candidate_contact").map(String::as_str),
        Some("ada@example.com")
    );
}

#[test]
fn pending_review_queue_is_admin_only() {
    let harness = build_harness(Arc::new(StubSignatureProvider));
    let employer = employer_ctx();
    let letter = harness
        .service
        .create_draft(&employer, new_letter(harness.candidate.id))
        .expect("draft created");
    harness.service.submit(&employer, letter.id).expect("submitted");

    match harness.service.pending_review(&employer, 10) {
        Err(AppError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }

    let queue = harness
        .service
        .pending_review(&admin_ctx(), 10)
        .expect("admin reads queue");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].status, "pending_review");
}
