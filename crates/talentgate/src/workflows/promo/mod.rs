//! Promo codes and the payment-provider boundary.
//!
//! Promo codes gate trial, discount, and membership grants. The payment
//! provider itself is an opaque collaborator: the crate only speaks its
//! documented contract (customers, checkout sessions, coupons, portal).

pub mod billing;
pub mod domain;
pub mod router;
pub mod service;

pub use billing::{
    BillingService, CheckoutSession, CustomerId, PaymentError, PaymentProvider,
    SubscriptionRecord, SubscriptionRepository,
};
pub use domain::{PromoCode, PromoGrant, PromoRepository, Redemption};
pub use router::promo_router;
pub use service::{NewPromoCode, PromoService, PromoView};
