use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::context::RequestContext;
use crate::error::AppError;

use super::billing::{BillingService, CheckoutSession, SubscriptionRepository};
use super::domain::{PromoRepository, Redemption};
use super::service::{NewPromoCode, PromoService, PromoView};

#[derive(Debug, Deserialize)]
struct CheckoutBody {
    email: String,
    plan: String,
    coupon_id: Option<String>,
}

/// Router builder exposing promo-code and billing endpoints.
pub fn promo_router<P, S>(
    promos: Arc<PromoService<P>>,
    billing: Arc<BillingService<S>>,
) -> Router
where
    P: PromoRepository + 'static,
    S: SubscriptionRepository + 'static,
{
    let promo_routes = Router::new()
        .route("/api/v1/admin/promo-codes", post(create_handler::<P>))
        .route("/api/v1/promo-codes/:code", get(validate_handler::<P>))
        .route(
            "/api/v1/promo-codes/:code/redeem",
            post(redeem_handler::<P>),
        )
        .with_state(promos);

    let billing_routes = Router::new()
        .route("/api/v1/billing/checkout", post(checkout_handler::<S>))
        .route("/api/v1/billing/portal", get(portal_handler::<S>))
        .with_state(billing);

    promo_routes.merge(billing_routes)
}

async fn create_handler<P>(
    State(service): State<Arc<PromoService<P>>>,
    headers: HeaderMap,
    Json(details): Json<NewPromoCode>,
) -> Result<(StatusCode, Json<PromoView>), AppError>
where
    P: PromoRepository + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let view = service.create(&ctx, details)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn validate_handler<P>(
    State(service): State<Arc<PromoService<P>>>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Result<Json<PromoView>, AppError>
where
    P: PromoRepository + 'static,
{
    let _ctx = RequestContext::from_headers(&headers)?;
    let view = service.validate(&code)?;
    Ok(Json(view))
}

async fn redeem_handler<P>(
    State(service): State<Arc<PromoService<P>>>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Result<Json<Redemption>, AppError>
where
    P: PromoRepository + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let redemption = service.redeem(&ctx, &code).await?;
    Ok(Json(redemption))
}

async fn checkout_handler<S>(
    State(service): State<Arc<BillingService<S>>>,
    headers: HeaderMap,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutSession>, AppError>
where
    S: SubscriptionRepository + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let session = service
        .checkout(&ctx, &body.email, &body.plan, body.coupon_id.as_deref())
        .await?;
    Ok(Json(session))
}

async fn portal_handler<S>(
    State(service): State<Arc<BillingService<S>>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError>
where
    S: SubscriptionRepository + 'static,
{
    let ctx = RequestContext::from_headers(&headers)?;
    let url = service.portal(&ctx).await?;
    Ok(Json(json!({ "url": url })))
}
