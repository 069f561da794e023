use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::UserId;

/// One line of the platform activity trail.
///
/// Activity recording is best-effort everywhere it is invoked: a failed
/// `record` is logged and never rolls back the mutation that preceded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub actor: Option<UserId>,
    pub action: String,
    pub subject: String,
    pub details: BTreeMap<String, String>,
    pub recorded_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(actor: Option<UserId>, action: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            actor,
            action: action.into(),
            subject: subject.into(),
            details: BTreeMap::new(),
            recorded_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Trait describing the audit sink (database table, log shipper, ...).
pub trait ActivityLog: Send + Sync {
    fn record(&self, entry: ActivityEntry) -> Result<(), ActivityError>;
}

/// Audit sink dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("activity sink unavailable: {0}")]
    Unavailable(String),
}
