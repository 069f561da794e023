use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;

use talentgate::workflows::letters::{letters_router, LetterService};
use talentgate::workflows::promo::{promo_router, BillingService, PromoService};
use talentgate::workflows::reconcile::{reconcile_router, ReconcileService};
use talentgate::workflows::scoring::{scoring_router, EvidenceService};

use crate::infra::{
    AppState, InMemoryActivityLog, InMemoryCandidateRepository, InMemoryEvidenceRepository,
    InMemoryLetterRepository, InMemoryNotifier, InMemoryPromoRepository,
    InMemorySessionRepository, InMemorySubscriptionRepository,
};

pub(crate) type Evidence =
    EvidenceService<InMemoryCandidateRepository, InMemoryEvidenceRepository, InMemoryActivityLog>;
pub(crate) type Letters = LetterService<
    InMemoryLetterRepository,
    InMemoryCandidateRepository,
    InMemoryNotifier,
    InMemoryActivityLog,
>;
pub(crate) type Reconcile =
    ReconcileService<InMemorySessionRepository, InMemoryCandidateRepository>;
pub(crate) type Promos = PromoService<InMemoryPromoRepository>;
pub(crate) type Billing = BillingService<InMemorySubscriptionRepository>;

/// The fully wired service set behind the HTTP surface.
pub(crate) struct Services {
    pub(crate) evidence: Arc<Evidence>,
    pub(crate) letters: Arc<Letters>,
    pub(crate) reconcile: Arc<Reconcile>,
    pub(crate) promos: Arc<Promos>,
    pub(crate) billing: Arc<Billing>,
}

pub(crate) fn with_app_routes(services: Services) -> axum::Router {
    scoring_router(services.evidence)
        .merge(letters_router(services.letters))
        .merge(reconcile_router(services.reconcile))
        .merge(promo_router(services.promos, services.billing))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::server::build_services;
    use talentgate::config::{ClassifierConfig, ScoringServiceConfig, SignatureConfig};

    fn test_router() -> axum::Router {
        let services = build_services(
            &ClassifierConfig {
                endpoint: None,
                fallback_endpoint: None,
                api_key: None,
            },
            &SignatureConfig {
                endpoint: None,
                api_key: None,
                webhook_secret: "test-secret".to_string(),
            },
            &ScoringServiceConfig {
                endpoint: None,
                api_key: None,
                poll_pause_ms: 0,
            },
        );
        with_app_routes(services)
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let router = test_router();
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn merged_routes_enforce_identity_headers() {
        let router = test_router();
        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/candidates/{}/score", Uuid::new_v4()))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_reconcile_endpoint_runs_an_empty_batch() {
        let router = test_router();
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/admin/scoring-sessions/reconcile")
                    .header("x-user-id", Uuid::new_v4().to_string())
                    .header("x-user-role", "admin")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let report: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(report["checked"], 0);
    }
}
