//! Core domain crate for the talentgate platform.
//!
//! The platform matches extraordinary-ability (O-1) visa candidates with
//! employers. This crate owns the evidence scoring and employer
//! interest-letter workflows, plus the reconciliation batch for the external
//! scoring provider and promo-code gating. HTTP serving, metrics, and the
//! concrete infrastructure adapters live in the `talentgate-api` service
//! crate.

pub mod audit;
pub mod config;
pub mod context;
pub mod error;
pub mod storage;
pub mod telemetry;
pub mod workflows;
