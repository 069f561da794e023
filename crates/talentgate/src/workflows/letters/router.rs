use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::ActivityLog;
use crate::context::RequestContext;
use crate::error::AppError;
use crate::workflows::scoring::CandidateRepository;

use super::domain::{InterestLetter, LetterId};
use super::repository::{LetterRepository, Notifier};
use super::service::{LetterService, LetterView, NewLetter, SignerDetails, WebhookAck};

/// Header carrying the provider's HMAC over the raw webhook payload.
pub const SIGNATURE_HEADER: &str = "x-provider-signature";

const PENDING_REVIEW_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct RejectBody {
    reason: String,
}

/// Router builder exposing the interest-letter workflow endpoints.
pub fn letters_router<R, C, N, L>(service: Arc<LetterService<R, C, N, L>>) -> Router
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    Router::new()
        .route("/api/v1/letters", post(create_handler::<R, C, N, L>))
        .route("/api/v1/letters/:letter_id", get(view_handler::<R, C, N, L>))
        .route(
            "/api/v1/letters/:letter_id/submit",
            post(submit_handler::<R, C, N, L>),
        )
        .route(
            "/api/v1/letters/:letter_id/approve",
            post(approve_handler::<R, C, N, L>),
        )
        .route(
            "/api/v1/letters/:letter_id/reject",
            post(reject_handler::<R, C, N, L>),
        )
        .route(
            "/api/v1/letters/:letter_id/signature",
            post(signature_handler::<R, C, N, L>),
        )
        .route(
            "/api/v1/letters/:letter_id/review",
            post(review_handler::<R, C, N, L>),
        )
        .route(
            "/api/v1/letters/:letter_id/forward",
            post(forward_handler::<R, C, N, L>),
        )
        .route(
            "/api/v1/admin/letters/pending",
            get(pending_handler::<R, C, N, L>),
        )
        .route(
            "/api/v1/webhooks/signature",
            post(webhook_handler::<R, C, N, L>),
        )
        .with_state(service)
}

async fn create_handler<R, C, N, L>(
    State(service): State<Arc<LetterService<R, C, N, L>>>,
    headers: HeaderMap,
    Json(details): Json<NewLetter>,
) -> Result<(StatusCode, Json<InterestLetter>), AppError>
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let letter = service.create_draft(&ctx, details)?;
    Ok((StatusCode::CREATED, Json(letter)))
}

async fn view_handler<R, C, N, L>(
    State(service): State<Arc<LetterService<R, C, N, L>>>,
    headers: HeaderMap,
    Path(letter_id): Path<Uuid>,
) -> Result<Json<LetterView>, AppError>
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service.view(&ctx, LetterId(letter_id))?;
    Ok(Json(view))
}

async fn submit_handler<R, C, N, L>(
    State(service): State<Arc<LetterService<R, C, N, L>>>,
    headers: HeaderMap,
    Path(letter_id): Path<Uuid>,
) -> Result<Json<LetterView>, AppError>
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service.submit(&ctx, LetterId(letter_id))?;
    Ok(Json(view))
}

async fn approve_handler<R, C, N, L>(
    State(service): State<Arc<LetterService<R, C, N, L>>>,
    headers: HeaderMap,
    Path(letter_id): Path<Uuid>,
) -> Result<Json<LetterView>, AppError>
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service.approve(&ctx, LetterId(letter_id))?;
    Ok(Json(view))
}

async fn reject_handler<R, C, N, L>(
    State(service): State<Arc<LetterService<R, C, N, L>>>,
    headers: HeaderMap,
    Path(letter_id): Path<Uuid>,
    Json(body): Json<RejectBody>,
) -> Result<Json<LetterView>, AppError>
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service.reject(&ctx, LetterId(letter_id), body.reason)?;
    Ok(Json(view))
}

async fn signature_handler<R, C, N, L>(
    State(service): State<Arc<LetterService<R, C, N, L>>>,
    headers: HeaderMap,
    Path(letter_id): Path<Uuid>,
    Json(signer): Json<SignerDetails>,
) -> Result<Json<LetterView>, AppError>
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service
        .request_signature(&ctx, LetterId(letter_id), signer)
        .await?;
    Ok(Json(view))
}

async fn review_handler<R, C, N, L>(
    State(service): State<Arc<LetterService<R, C, N, L>>>,
    headers: HeaderMap,
    Path(letter_id): Path<Uuid>,
) -> Result<Json<LetterView>, AppError>
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service.begin_admin_review(&ctx, LetterId(letter_id))?;
    Ok(Json(view))
}

async fn forward_handler<R, C, N, L>(
    State(service): State<Arc<LetterService<R, C, N, L>>>,
    headers: HeaderMap,
    Path(letter_id): Path<Uuid>,
) -> Result<Json<LetterView>, AppError>
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service.forward(&ctx, LetterId(letter_id))?;
    Ok(Json(view))
}

async fn pending_handler<R, C, N, L>(
    State(service): State<Arc<LetterService<R, C, N, L>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<LetterView>>, AppError>
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let queue = service.pending_review(&ctx, PENDING_REVIEW_LIMIT)?;
    Ok(Json(queue))
}

async fn webhook_handler<R, C, N, L>(
    State(service): State<Arc<LetterService<R, C, N, L>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError>
where
    R: LetterRepository + 'static,
    C: CandidateRepository + 'static,
    N: Notifier + 'static,
    L: ActivityLog + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let ack = service.handle_webhook(&body, signature)?;
    Ok(Json(ack))
}
