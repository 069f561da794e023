use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::AppError;

use super::billing::PaymentProvider;
use super::domain::{PromoCode, PromoGrant, PromoRepository, Redemption};

/// Admin payload creating a promo code.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPromoCode {
    pub code: String,
    pub grant: PromoGrant,
    pub max_redemptions: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Redeemability snapshot returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct PromoView {
    pub code: String,
    pub grant: PromoGrant,
    pub remaining_redemptions: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PromoView {
    fn from_code(promo: &PromoCode) -> Self {
        Self {
            code: promo.code.clone(),
            grant: promo.grant,
            remaining_redemptions: promo
                .max_redemptions
                .map(|max| max.saturating_sub(promo.redemption_count)),
            expires_at: promo.expires_at,
        }
    }
}

/// Promo-code management and redemption.
pub struct PromoService<P> {
    promos: Arc<P>,
    payments: Arc<dyn PaymentProvider>,
}

impl<P> PromoService<P>
where
    P: PromoRepository + 'static,
{
    pub fn new(promos: Arc<P>, payments: Arc<dyn PaymentProvider>) -> Self {
        Self { promos, payments }
    }

    /// Create a code. A duplicate fails with `Conflict` and leaves the
    /// existing row untouched (store-enforced uniqueness).
    pub fn create(
        &self,
        ctx: &RequestContext,
        details: NewPromoCode,
    ) -> Result<PromoView, AppError> {
        ctx.require_admin()?;

        let code = details.code.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(AppError::InvalidInput("a code is required".to_string()));
        }
        if let PromoGrant::DiscountPercent { percent } = details.grant {
            if percent == 0 || percent > 100 {
                return Err(AppError::InvalidInput(
                    "discount percent must be within 1..=100".to_string(),
                ));
            }
        }

        let promo = PromoCode {
            code,
            grant: details.grant,
            max_redemptions: details.max_redemptions,
            redemption_count: 0,
            expires_at: details.expires_at,
            created_at: Utc::now(),
        };
        let stored = self.promos.insert(promo)?;
        Ok(PromoView::from_code(&stored))
    }

    /// Check a code without redeeming it.
    pub fn validate(&self, code: &str) -> Result<PromoView, AppError> {
        let promo = self.usable(code, Utc::now())?;
        Ok(PromoView::from_code(&promo))
    }

    /// Redeem a code for the session's account.
    ///
    /// Discount grants mint a provider coupon first; an upstream failure
    /// surfaces before any redemption is recorded. A second redemption by
    /// the same account fails with `Conflict`.
    pub async fn redeem(
        &self,
        ctx: &RequestContext,
        code: &str,
    ) -> Result<Redemption, AppError> {
        let now = Utc::now();
        let mut promo = self.usable(code, now)?;

        let coupon_id = match promo.grant {
            PromoGrant::DiscountPercent { percent } => Some(
                self.payments
                    .create_coupon(percent)
                    .await
                    .map_err(|err| AppError::Upstream(err.to_string()))?,
            ),
            PromoGrant::TrialDays { .. } | PromoGrant::Membership => None,
        };

        let redemption = Redemption {
            code: promo.code.clone(),
            user_id: ctx.user_id,
            coupon_id,
            redeemed_at: now,
        };
        self.promos.record_redemption(redemption.clone())?;

        promo.redemption_count += 1;
        self.promos.update(promo)?;

        Ok(redemption)
    }

    fn usable(&self, code: &str, now: DateTime<Utc>) -> Result<PromoCode, AppError> {
        let normalized = code.trim().to_ascii_uppercase();
        let promo = self
            .promos
            .fetch(&normalized)?
            .ok_or_else(|| AppError::NotFound(format!("promo code {normalized}")))?;

        if promo.is_expired(now) {
            return Err(AppError::InvalidState(format!(
                "promo code {normalized} has expired"
            )));
        }
        if promo.is_exhausted() {
            return Err(AppError::InvalidState(format!(
                "promo code {normalized} is fully redeemed"
            )));
        }
        Ok(promo)
    }
}
