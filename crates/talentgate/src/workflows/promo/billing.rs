use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{RequestContext, UserId};
use crate::error::AppError;
use crate::storage::RepositoryError;

/// Customer identifier issued by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerId(pub String);

/// Hosted checkout session handed back to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment provider error: {0}")]
    Provider(String),
}

/// Boundary trait for the payment provider's documented contract.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_customer(&self, email: &str) -> Result<CustomerId, PaymentError>;
    async fn create_checkout_session(
        &self,
        customer: &CustomerId,
        plan: &str,
        coupon_id: Option<&str>,
    ) -> Result<CheckoutSession, PaymentError>;
    /// Mint a percent-off coupon, returning the provider's coupon id.
    async fn create_coupon(&self, percent_off: u8) -> Result<String, PaymentError>;
    async fn billing_portal_url(&self, customer: &CustomerId) -> Result<String, PaymentError>;
}

/// Subscription row linking an account to its provider customer id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: UserId,
    pub provider_customer_id: CustomerId,
    pub plan: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Storage abstraction over subscription records.
pub trait SubscriptionRepository: Send + Sync {
    fn fetch_by_user(&self, user: &UserId) -> Result<Option<SubscriptionRecord>, RepositoryError>;
    fn insert(&self, record: SubscriptionRecord) -> Result<SubscriptionRecord, RepositoryError>;
}

/// Thin billing facade: resolves the provider customer for the session's
/// account, then delegates to the provider.
pub struct BillingService<S> {
    subscriptions: Arc<S>,
    payments: Arc<dyn PaymentProvider>,
}

impl<S> BillingService<S>
where
    S: SubscriptionRepository + 'static,
{
    pub fn new(subscriptions: Arc<S>, payments: Arc<dyn PaymentProvider>) -> Self {
        Self {
            subscriptions,
            payments,
        }
    }

    /// Open a hosted checkout session, creating the provider customer on
    /// first use.
    pub async fn checkout(
        &self,
        ctx: &RequestContext,
        email: &str,
        plan: &str,
        coupon_id: Option<&str>,
    ) -> Result<CheckoutSession, AppError> {
        if plan.trim().is_empty() {
            return Err(AppError::InvalidInput("a plan is required".to_string()));
        }
        let customer = self.customer_for(ctx, email).await?;
        self.payments
            .create_checkout_session(&customer, plan, coupon_id)
            .await
            .map_err(|err| AppError::Upstream(err.to_string()))
    }

    /// Self-service billing portal for an existing customer.
    pub async fn portal(&self, ctx: &RequestContext) -> Result<String, AppError> {
        let record = self
            .subscriptions
            .fetch_by_user(&ctx.user_id)?
            .ok_or_else(|| AppError::NotFound("no subscription on file".to_string()))?;
        self.payments
            .billing_portal_url(&record.provider_customer_id)
            .await
            .map_err(|err| AppError::Upstream(err.to_string()))
    }

    async fn customer_for(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<CustomerId, AppError> {
        if let Some(record) = self.subscriptions.fetch_by_user(&ctx.user_id)? {
            return Ok(record.provider_customer_id);
        }

        let customer = self
            .payments
            .create_customer(email)
            .await
            .map_err(|err| AppError::Upstream(err.to_string()))?;
        let record = SubscriptionRecord {
            user_id: ctx.user_id,
            provider_customer_id: customer.clone(),
            plan: None,
            created_at: Utc::now(),
        };
        self.subscriptions.insert(record)?;
        Ok(customer)
    }
}
