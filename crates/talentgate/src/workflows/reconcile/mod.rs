//! Reconciliation of external scoring sessions.
//!
//! The external scoring service runs asynchronously: sessions are created on
//! demand and polled later. Reconciliation is an idempotent batch over every
//! session not yet in a terminal state, triggered by an external time-based
//! invocation (admin endpoint or CLI), never by an in-process scheduler.

pub mod client;
pub mod domain;
pub mod router;
pub mod service;

pub use client::{
    ExternalScoringClient, HttpScoringClient, ScoringClientError, SessionPoll,
};
pub use domain::{
    ScoringSession, SessionExtract, SessionId, SessionRepository, SessionStatus,
};
pub use router::reconcile_router;
pub use service::{ReconcileReport, ReconcileService, SessionView};
