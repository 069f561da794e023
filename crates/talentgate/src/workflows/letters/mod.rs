//! Employer interest letters: the review/approval state machine, the
//! e-signature sub-flow driven by provider webhooks, and the admin-gated
//! forward step that reveals candidate contact details.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod signature;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use domain::{
    CommitmentLevel, EmployerId, EngagementTerms, InterestLetter, LetterId, LetterStatus,
    SignatureStatus,
};
pub use repository::{LetterRepository, Notification, Notifier, NotifyError, Recipient};
pub use router::{letters_router, SIGNATURE_HEADER};
pub use service::{LetterService, LetterView, NewLetter, SignerDetails, WebhookAck};
pub use signature::{
    sign_payload, verify_signature, HttpSignatureProvider, ProviderDocument, SignatureEvent,
    SignatureProvider, SignatureProviderError, SignatureWebhook, SigningRequest,
};
pub use transitions::{LetterEvent, SideEffect, Transition, TransitionError};
