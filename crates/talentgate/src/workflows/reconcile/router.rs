use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::workflows::scoring::{CandidateId, CandidateRepository};

use super::domain::{SessionId, SessionRepository};
use super::service::{ReconcileReport, ReconcileService, SessionView};

/// Router builder exposing the external-scoring session endpoints.
pub fn reconcile_router<S, C>(service: Arc<ReconcileService<S, C>>) -> Router
where
    S: SessionRepository + 'static,
    C: CandidateRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/candidates/:candidate_id/scoring-sessions",
            post(request_handler::<S, C>),
        )
        .route(
            "/api/v1/scoring-sessions/:session_id",
            get(session_handler::<S, C>),
        )
        .route(
            "/api/v1/admin/scoring-sessions/reconcile",
            post(reconcile_handler::<S, C>),
        )
        .with_state(service)
}

async fn request_handler<S, C>(
    State(service): State<Arc<ReconcileService<S, C>>>,
    headers: HeaderMap,
    Path(candidate_id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionView>), AppError>
where
    S: SessionRepository + 'static,
    C: CandidateRepository + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service
        .request_scoring(&ctx, CandidateId(candidate_id))
        .await?;
    Ok((StatusCode::ACCEPTED, Json(view)))
}

async fn session_handler<S, C>(
    State(service): State<Arc<ReconcileService<S, C>>>,
    headers: HeaderMap,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError>
where
    S: SessionRepository + 'static,
    C: CandidateRepository + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service.session(&ctx, SessionId(session_id))?;
    Ok(Json(view))
}

async fn reconcile_handler<S, C>(
    State(service): State<Arc<ReconcileService<S, C>>>,
    headers: HeaderMap,
) -> Result<Json<ReconcileReport>, AppError>
where
    S: SessionRepository + 'static,
    C: CandidateRepository + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    ctx.require_admin()?;
    let report = service.run().await?;
    Ok(Json(report))
}
