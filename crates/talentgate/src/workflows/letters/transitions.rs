use chrono::{DateTime, Utc};

use super::domain::{InterestLetter, LetterStatus, SignatureStatus};
use super::signature::SignatureEvent;

/// Events that can move a letter through its workflow.
#[derive(Debug, Clone)]
pub enum LetterEvent {
    /// Employer submits the draft for administrative review.
    Submit,
    /// Admin approves; the letter is sent to the candidate in the same step.
    Approve,
    /// Admin rejects with a reason.
    Reject { reason: String },
    /// Outbound signing request accepted by the provider.
    SignatureRequested { provider_document_id: String },
    /// Asynchronous provider webhook event.
    Signature(SignatureEvent),
    /// Admin picks up a signed letter for final review.
    BeginAdminReview,
    /// Admin forwards the signed copy to the employer, revealing contact
    /// details.
    Forward,
}

impl LetterEvent {
    fn name(&self) -> &'static str {
        match self {
            LetterEvent::Submit => "submit",
            LetterEvent::Approve => "approve",
            LetterEvent::Reject { .. } => "reject",
            LetterEvent::SignatureRequested { .. } => "signature_requested",
            LetterEvent::Signature(_) => "signature_event",
            LetterEvent::BeginAdminReview => "begin_admin_review",
            LetterEvent::Forward => "forward",
        }
    }
}

/// Side effects a transition asks the caller to run after commit. Each one
/// is best-effort and independently loggable; none may roll back the
/// transition that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    NotifyAdmins { template: &'static str },
    NotifyCandidate { template: &'static str },
    NotifyEmployer {
        template: &'static str,
        include_contact: bool,
    },
    RecordActivity { action: &'static str },
}

/// Result of a validated transition: the updated letter plus the effect
/// intents to execute after the store accepts it.
#[derive(Debug, Clone)]
pub struct Transition {
    pub letter: InterestLetter,
    pub effects: Vec<SideEffect>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("{event} is not valid while the letter is {status}/{signature_status}")]
    InvalidState {
        event: &'static str,
        status: &'static str,
        signature_status: &'static str,
    },
    #[error("letter is missing required fields: {0}")]
    MissingFields(&'static str),
    #[error("no signed document captured for this letter")]
    MissingSignature,
}

fn invalid(letter: &InterestLetter, event: &LetterEvent) -> TransitionError {
    TransitionError::InvalidState {
        event: event.name(),
        status: letter.status.label(),
        signature_status: letter.signature_status.label(),
    }
}

/// Apply one event to a letter.
///
/// Pure with respect to identity and storage: authorization happens in the
/// service layer before this is called, and the caller persists the returned
/// letter. A mismatched state fails without producing any mutation.
pub fn apply(
    letter: &InterestLetter,
    event: LetterEvent,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    match &event {
        LetterEvent::Submit => submit(letter, &event, now),
        LetterEvent::Approve => approve(letter, &event, now),
        LetterEvent::Reject { reason } => reject(letter, &event, reason.clone(), now),
        LetterEvent::SignatureRequested {
            provider_document_id,
        } => signature_requested(letter, &event, provider_document_id.clone()),
        LetterEvent::Signature(signature_event) => {
            signature(letter, &event, signature_event.clone())
        }
        LetterEvent::BeginAdminReview => begin_admin_review(letter, &event),
        LetterEvent::Forward => forward(letter, &event, now),
    }
}

fn submit(
    letter: &InterestLetter,
    event: &LetterEvent,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    if letter.status != LetterStatus::Draft {
        return Err(invalid(letter, event));
    }
    if !letter.has_required_fields() {
        return Err(TransitionError::MissingFields(
            "job title, duties, and justification",
        ));
    }

    let mut updated = letter.clone();
    updated.status = LetterStatus::PendingReview;
    updated.submitted_at = Some(now);

    Ok(Transition {
        letter: updated,
        effects: vec![
            SideEffect::NotifyAdmins {
                template: "letter_submitted",
            },
            SideEffect::RecordActivity {
                action: "letter_submitted",
            },
        ],
    })
}

fn approve(
    letter: &InterestLetter,
    event: &LetterEvent,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    if letter.status != LetterStatus::PendingReview {
        return Err(invalid(letter, event));
    }

    let mut updated = letter.clone();
    updated.status = LetterStatus::Sent;
    updated.reviewed_at = Some(now);

    Ok(Transition {
        letter: updated,
        effects: vec![
            SideEffect::NotifyCandidate {
                template: "letter_received",
            },
            SideEffect::RecordActivity {
                action: "letter_approved",
            },
        ],
    })
}

fn reject(
    letter: &InterestLetter,
    event: &LetterEvent,
    reason: String,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    if letter.status != LetterStatus::PendingReview {
        return Err(invalid(letter, event));
    }

    let mut updated = letter.clone();
    updated.status = LetterStatus::Rejected;
    updated.reviewed_at = Some(now);
    updated.rejection_reason = Some(reason);

    Ok(Transition {
        letter: updated,
        effects: vec![SideEffect::RecordActivity {
            action: "letter_rejected",
        }],
    })
}

fn signature_requested(
    letter: &InterestLetter,
    event: &LetterEvent,
    provider_document_id: String,
) -> Result<Transition, TransitionError> {
    if !letter.can_request_signature() {
        return Err(invalid(letter, event));
    }

    let mut updated = letter.clone();
    updated.signature_status = SignatureStatus::Requested;
    updated.provider_document_id = Some(provider_document_id);

    Ok(Transition {
        letter: updated,
        effects: vec![SideEffect::RecordActivity {
            action: "signature_requested",
        }],
    })
}

fn signature(
    letter: &InterestLetter,
    event: &LetterEvent,
    signature_event: SignatureEvent,
) -> Result<Transition, TransitionError> {
    if letter.status != LetterStatus::Sent {
        return Err(invalid(letter, event));
    }

    let mut updated = letter.clone();
    let mut effects = vec![SideEffect::RecordActivity {
        action: "signature_event",
    }];

    // Provider deliveries can arrive late or out of order; progress events
    // only apply while the sub-flow is still in flight, and nothing regresses
    // a terminal sub-state.
    let in_flight = matches!(
        letter.signature_status,
        SignatureStatus::Requested | SignatureStatus::SentToSigner | SignatureStatus::Viewed
    );

    match signature_event {
        SignatureEvent::Sent => {
            if !in_flight {
                return Err(invalid(letter, event));
            }
            updated.signature_status = SignatureStatus::SentToSigner;
        }
        SignatureEvent::Viewed => {
            if !in_flight {
                return Err(invalid(letter, event));
            }
            updated.signature_status = SignatureStatus::Viewed;
        }
        SignatureEvent::Completed {
            document_ref,
            completed_at,
        } => {
            if !in_flight {
                return Err(invalid(letter, event));
            }
            updated.signature_status = SignatureStatus::Signed;
            updated.signed_document_ref = Some(document_ref);
            updated.signature_completed_at = Some(completed_at);
            effects.push(SideEffect::NotifyAdmins {
                template: "signature_completed",
            });
        }
        SignatureEvent::Declined => {
            if !in_flight {
                return Err(invalid(letter, event));
            }
            updated.signature_status = SignatureStatus::Declined;
        }
        SignatureEvent::Expired => {
            if !in_flight {
                return Err(invalid(letter, event));
            }
            updated.signature_status = SignatureStatus::Expired;
        }
        SignatureEvent::Cancelled => {
            updated.signature_status = SignatureStatus::None;
            updated.provider_document_id = None;
            updated.signed_document_ref = None;
        }
    }

    Ok(Transition {
        letter: updated,
        effects,
    })
}

fn begin_admin_review(
    letter: &InterestLetter,
    event: &LetterEvent,
) -> Result<Transition, TransitionError> {
    if letter.signature_status != SignatureStatus::Signed {
        return Err(invalid(letter, event));
    }

    let mut updated = letter.clone();
    updated.signature_status = SignatureStatus::AdminReviewing;

    Ok(Transition {
        letter: updated,
        effects: vec![SideEffect::RecordActivity {
            action: "signature_admin_review",
        }],
    })
}

fn forward(
    letter: &InterestLetter,
    event: &LetterEvent,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    if letter.signature_status != SignatureStatus::AdminReviewing {
        return Err(invalid(letter, event));
    }
    if letter.signed_document_ref.is_none() {
        return Err(TransitionError::MissingSignature);
    }

    let mut updated = letter.clone();
    updated.signature_status = SignatureStatus::ForwardedToEmployer;
    if updated.contact_revealed_at.is_none() {
        updated.contact_revealed_at = Some(now);
    }

    Ok(Transition {
        letter: updated,
        effects: vec![
            SideEffect::NotifyEmployer {
                template: "signed_letter_forwarded",
                include_contact: true,
            },
            SideEffect::RecordActivity {
                action: "letter_forwarded",
            },
        ],
    })
}
