use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::UserId;
use crate::storage::RepositoryError;

/// What a promo code grants on redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromoGrant {
    TrialDays { days: u16 },
    DiscountPercent { percent: u8 },
    Membership,
}

/// A redeemable promo code. `code` is unique in storage; duplicate creation
/// surfaces as a distinct conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub grant: PromoGrant,
    pub max_redemptions: Option<u32>,
    pub redemption_count: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_redemptions
            .map(|max| self.redemption_count >= max)
            .unwrap_or(false)
    }
}

/// One account's redemption of a code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redemption {
    pub code: String,
    pub user_id: UserId,
    /// Provider coupon minted for discount grants.
    pub coupon_id: Option<String>,
    pub redeemed_at: DateTime<Utc>,
}

/// Storage abstraction over promo codes and redemptions. Uniqueness of the
/// code, and of (code, user) for redemptions, is enforced by the store and
/// reported as `Conflict` without touching the existing row.
pub trait PromoRepository: Send + Sync {
    fn insert(&self, promo: PromoCode) -> Result<PromoCode, RepositoryError>;
    fn fetch(&self, code: &str) -> Result<Option<PromoCode>, RepositoryError>;
    fn update(&self, promo: PromoCode) -> Result<(), RepositoryError>;
    fn record_redemption(&self, redemption: Redemption) -> Result<(), RepositoryError>;
}
