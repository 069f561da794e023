use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use uuid::Uuid;

use talentgate::context::{RequestContext, Role, UserId};
use talentgate::error::AppError;
use talentgate::workflows::letters::{
    sign_payload, CommitmentLevel, EngagementTerms, LetterRepository, LetterService, NewLetter,
    SignerDetails,
};
use talentgate::workflows::promo::{BillingService, NewPromoCode, PromoGrant, PromoService};
use talentgate::workflows::reconcile::ReconcileService;
use talentgate::workflows::scoring::{
    CandidateId, EvidenceService, NewCandidate, NewEvidence, ReviewDecision, ScoringEngine,
};

use crate::infra::{
    InMemoryActivityLog, InMemoryCandidateRepository, InMemoryEvidenceRepository,
    InMemoryLetterRepository, InMemoryNotifier, InMemoryPromoRepository,
    InMemorySessionRepository, InMemorySubscriptionRepository, KeywordClassifier,
    SimulatedPaymentProvider, SimulatedScoringClient, SimulatedSignatureProvider,
};
use crate::server::StartupError;

const DEMO_WEBHOOK_SECRET: &str = "demo-webhook-secret";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the interest-letter portion of the demo.
    #[arg(long)]
    pub(crate) skip_letters: bool,
    /// Skip the promo-code and billing portion of the demo.
    #[arg(long)]
    pub(crate) skip_billing: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), StartupError> {
    println!("Talent matching workflow demo");

    let candidates = Arc::new(InMemoryCandidateRepository::default());
    let activity = Arc::new(InMemoryActivityLog::default());

    let evidence_service = EvidenceService::new(
        candidates.clone(),
        Arc::new(InMemoryEvidenceRepository::default()),
        activity.clone(),
        Arc::new(KeywordClassifier),
        ScoringEngine::default(),
    );

    let candidate_ctx = RequestContext::new(UserId(Uuid::new_v4()), Role::Candidate);
    let admin_ctx = RequestContext::new(UserId(Uuid::new_v4()), Role::Admin);
    let employer_ctx = RequestContext::new(UserId(Uuid::new_v4()), Role::Employer);

    let profile = evidence_service.register_candidate(
        &candidate_ctx,
        NewCandidate {
            display_name: "Ada Qureshi".to_string(),
            contact_email: "ada@example.com".to_string(),
            field_of_expertise: "Distributed systems".to_string(),
        },
    )?;
    println!(
        "\nCandidate registered: {} ({})",
        profile.display_name, profile.candidate_code
    );

    let uploads = [
        (
            "Best Paper award letter",
            "Award for systems research at a flagship venue",
        ),
        (
            "Press profile",
            "In-depth press feature on the candidate's work",
        ),
        (
            "Journal article",
            "Peer-reviewed journal publication on consensus protocols",
        ),
        (
            "Patent grant",
            "Granted patent covering replicated log compaction",
        ),
    ];
    for (title, text) in uploads {
        let document = evidence_service
            .upload(
                &candidate_ctx,
                profile.id,
                NewEvidence {
                    title: title.to_string(),
                    description: None,
                    content_type: "application/pdf".to_string(),
                    content_ref: format!(
                        "uploads/{}.pdf",
                        title.to_ascii_lowercase().replace(' ', "-")
                    ),
                    extracted_text: text.to_string(),
                },
            )
            .await?;
        if let Some(classification) = document.classification.as_ref() {
            println!(
                "  uploaded '{}' -> {} (impact {})",
                title,
                classification.criterion.key(),
                classification.score_impact
            );
        }
        evidence_service.review(
            &admin_ctx,
            document.id,
            ReviewDecision::Verify {
                criterion: None,
                score_impact: None,
            },
        )?;
    }

    let score = evidence_service.summary(&candidate_ctx, profile.id)?;
    println!(
        "\nEvidence summary: overall {}/100 ({})",
        score.overall_score, score.qualification
    );
    for assessment in &score.summary.criteria {
        if assessment.evidence_count > 0 {
            println!(
                "  {:<24} {:>2}/{:<2} met={}",
                assessment.key.key(),
                assessment.score,
                assessment.max_score,
                assessment.met
            );
        }
    }

    if !args.skip_letters {
        run_letter_demo(&candidates, &employer_ctx, &admin_ctx, profile.id).await?;
    }

    if !args.skip_billing {
        run_billing_demo(&employer_ctx, &admin_ctx).await?;
    }

    let sessions = Arc::new(InMemorySessionRepository::default());
    let reconcile = ReconcileService::new(
        sessions,
        candidates,
        Arc::new(SimulatedScoringClient),
        Duration::from_millis(10),
    );
    let session = reconcile.request_scoring(&candidate_ctx, profile.id).await?;
    println!(
        "\nExternal scoring session {} opened ({})",
        session.session_id.0, session.status
    );
    let report = reconcile.run().await?;
    println!(
        "Reconciliation: checked {}, completed {}, failed {}, pending {}",
        report.checked, report.completed, report.failed, report.still_pending
    );
    let refreshed = reconcile.session(&candidate_ctx, session.session_id)?;
    if let Some(external) = refreshed.external_score {
        println!(
            "  provider scored {}/100: {}",
            external,
            refreshed.assessment.as_deref().unwrap_or("(no assessment)")
        );
    }

    println!(
        "\nDemo complete. {} activity entries recorded.",
        activity.entries().len()
    );
    Ok(())
}

async fn run_letter_demo(
    candidates: &Arc<InMemoryCandidateRepository>,
    employer_ctx: &RequestContext,
    admin_ctx: &RequestContext,
    candidate_id: CandidateId,
) -> Result<(), StartupError> {
    println!("\nInterest letter workflow");

    let letters_store = Arc::new(InMemoryLetterRepository::default());
    let notifier = Arc::new(InMemoryNotifier::default());
    let letter_service = LetterService::new(
        letters_store.clone(),
        candidates.clone(),
        notifier.clone(),
        Arc::new(InMemoryActivityLog::default()),
        Arc::new(SimulatedSignatureProvider),
        DEMO_WEBHOOK_SECRET,
    );

    let letter = letter_service.create_draft(
        employer_ctx,
        NewLetter {
            candidate_id,
            job_posting_id: None,
            job_title: "Principal Engineer".to_string(),
            duties: "Lead the storage platform group.".to_string(),
            justification: "Publication record matches our roadmap.".to_string(),
            commitment: CommitmentLevel::OfferIntended,
            terms: EngagementTerms {
                annual_compensation_usd: Some(240_000),
                hours_per_week: Some(40),
                engagement_type: Some("full_time".to_string()),
            },
        },
    )?;
    letter_service.submit(employer_ctx, letter.id)?;
    let approved = letter_service.approve(admin_ctx, letter.id)?;
    println!("  letter {} approved and {}", letter.id.0, approved.status);

    letter_service
        .request_signature(
            employer_ctx,
            letter.id,
            SignerDetails {
                email: "legal@employer.example".to_string(),
                name: "Jordan Park".to_string(),
            },
        )
        .await?;

    let envelope = letters_store
        .fetch(&letter.id)
        .map_err(AppError::from)?
        .and_then(|stored| stored.provider_document_id)
        .ok_or_else(|| AppError::InvalidState("no envelope recorded for letter".to_string()))?;

    for event_type in ["document_sent", "document_viewed", "document_completed"] {
        let mut payload = serde_json::json!({
            "event_type": event_type,
            "document_id": envelope
        });
        if event_type == "document_completed" {
            payload["completed_document_url"] =
                serde_json::json!(format!("signed/{envelope}.pdf"));
        }
        let raw = payload.to_string();
        let header = sign_payload(raw.as_bytes(), DEMO_WEBHOOK_SECRET.as_bytes());
        let ack = letter_service.handle_webhook(raw.as_bytes(), Some(&header))?;
        println!("  webhook {event_type}: processed={}", ack.processed);
    }

    letter_service.begin_admin_review(admin_ctx, letter.id)?;
    let forwarded = letter_service.forward(admin_ctx, letter.id)?;
    println!(
        "  forwarded to employer; contact revealed: {}",
        forwarded.candidate_contact.as_deref().unwrap_or("(hidden)")
    );
    println!("  notifications delivered: {}", notifier.messages().len());
    Ok(())
}

async fn run_billing_demo(
    employer_ctx: &RequestContext,
    admin_ctx: &RequestContext,
) -> Result<(), StartupError> {
    println!("\nPromo codes and billing");

    let promo_service = PromoService::new(
        Arc::new(InMemoryPromoRepository::default()),
        Arc::new(SimulatedPaymentProvider),
    );
    let billing_service = BillingService::new(
        Arc::new(InMemorySubscriptionRepository::default()),
        Arc::new(SimulatedPaymentProvider),
    );

    promo_service.create(
        admin_ctx,
        NewPromoCode {
            code: "LAUNCH25".to_string(),
            grant: PromoGrant::DiscountPercent { percent: 25 },
            max_redemptions: Some(100),
            expires_at: None,
        },
    )?;
    let redemption = promo_service.redeem(employer_ctx, "launch25").await?;
    println!(
        "  LAUNCH25 redeemed, coupon {}",
        redemption.coupon_id.as_deref().unwrap_or("(none)")
    );

    let checkout = billing_service
        .checkout(
            employer_ctx,
            "billing@employer.example",
            "employer_monthly",
            redemption.coupon_id.as_deref(),
        )
        .await?;
    println!("  checkout session: {}", checkout.url);

    let portal = billing_service.portal(employer_ctx).await?;
    println!("  billing portal: {portal}");
    Ok(())
}
