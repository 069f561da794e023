use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::audit::ActivityLog;
use crate::context::RequestContext;
use crate::error::AppError;

use super::domain::{CandidateId, CandidateProfile, DocumentId, EvidenceDocument};
use super::repository::{CandidateRepository, DocumentStatusView, EvidenceRepository};
use super::service::{EvidenceService, NewCandidate, NewEvidence, ReviewDecision, ScoreView};

/// Router builder exposing the candidate profile and evidence endpoints.
pub fn scoring_router<C, E, L>(service: Arc<EvidenceService<C, E, L>>) -> Router
where
    C: CandidateRepository + 'static,
    E: EvidenceRepository + 'static,
    L: ActivityLog + 'static,
{
    Router::new()
        .route("/api/v1/candidates", post(register_handler::<C, E, L>))
        .route(
            "/api/v1/candidates/:candidate_id/evidence",
            post(upload_handler::<C, E, L>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/evidence/pending",
            get(pending_handler::<C, E, L>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/score",
            get(score_handler::<C, E, L>),
        )
        .route(
            "/api/v1/evidence/:document_id/review",
            post(review_handler::<C, E, L>),
        )
        .route(
            "/api/v1/evidence/:document_id",
            delete(delete_handler::<C, E, L>),
        )
        .with_state(service)
}

async fn register_handler<C, E, L>(
    State(service): State<Arc<EvidenceService<C, E, L>>>,
    headers: HeaderMap,
    Json(details): Json<NewCandidate>,
) -> Result<(StatusCode, Json<CandidateProfile>), AppError>
where
    C: CandidateRepository + 'static,
    E: EvidenceRepository + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let profile = service.register_candidate(&ctx, details)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn upload_handler<C, E, L>(
    State(service): State<Arc<EvidenceService<C, E, L>>>,
    headers: HeaderMap,
    Path(candidate_id): Path<Uuid>,
    Json(upload): Json<NewEvidence>,
) -> Result<(StatusCode, Json<EvidenceDocument>), AppError>
where
    C: CandidateRepository + 'static,
    E: EvidenceRepository + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let document = service
        .upload(&ctx, CandidateId(candidate_id), upload)
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

async fn pending_handler<C, E, L>(
    State(service): State<Arc<EvidenceService<C, E, L>>>,
    headers: HeaderMap,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<Vec<DocumentStatusView>>, AppError>
where
    C: CandidateRepository + 'static,
    E: EvidenceRepository + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let pending = service.pending_documents(&ctx, CandidateId(candidate_id))?;
    Ok(Json(pending))
}

async fn score_handler<C, E, L>(
    State(service): State<Arc<EvidenceService<C, E, L>>>,
    headers: HeaderMap,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<ScoreView>, AppError>
where
    C: CandidateRepository + 'static,
    E: EvidenceRepository + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service.summary(&ctx, CandidateId(candidate_id))?;
    Ok(Json(view))
}

async fn review_handler<C, E, L>(
    State(service): State<Arc<EvidenceService<C, E, L>>>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
    Json(decision): Json<ReviewDecision>,
) -> Result<Json<DocumentStatusView>, AppError>
where
    C: CandidateRepository + 'static,
    E: EvidenceRepository + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service.review(&ctx, DocumentId(document_id), decision)?;
    Ok(Json(view))
}

async fn delete_handler<C, E, L>(
    State(service): State<Arc<EvidenceService<C, E, L>>>,
    headers: HeaderMap,
    Path(document_id): Path<Uuid>,
) -> Result<StatusCode, AppError>
where
    C: CandidateRepository + 'static,
    E: EvidenceRepository + 'static,
    L: ActivityLog + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    service.delete(&ctx, DocumentId(document_id))?;
    Ok(StatusCode::NO_CONTENT)
}
