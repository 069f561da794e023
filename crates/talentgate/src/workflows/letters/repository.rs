use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::RepositoryError;
use crate::workflows::scoring::CandidateId;

use super::domain::{EmployerId, InterestLetter, LetterId};

/// Storage abstraction over interest letters.
pub trait LetterRepository: Send + Sync {
    fn insert(&self, letter: InterestLetter) -> Result<InterestLetter, RepositoryError>;
    fn fetch(&self, id: &LetterId) -> Result<Option<InterestLetter>, RepositoryError>;
    fn update(&self, letter: InterestLetter) -> Result<(), RepositoryError>;
    /// Locate the letter a provider webhook refers to by its envelope id.
    fn find_by_provider_document(
        &self,
        provider_document_id: &str,
    ) -> Result<Option<InterestLetter>, RepositoryError>;
    fn pending_review(&self, limit: usize) -> Result<Vec<InterestLetter>, RepositoryError>;
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    Admins,
    Candidate(CandidateId),
    Employer(EmployerId),
}

/// Templated message handed to the notification sender. Delivery is
/// fire-and-forget: failures are logged and never block the transition that
/// produced the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub template: String,
    pub details: BTreeMap<String, String>,
}

/// Trait describing outbound notification hooks (e-mail adapter, in-app
/// notification table, ...).
pub trait Notifier: Send + Sync {
    fn deliver(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
