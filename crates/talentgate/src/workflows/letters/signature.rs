use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::domain::LetterId;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_TIMEOUT_SECS: u64 = 30;

/// Raw webhook payload as delivered by the signature provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SignatureWebhook {
    pub event_type: String,
    pub document_id: String,
    pub signer_email: Option<String>,
    pub signer_name: Option<String>,
    pub completed_document_url: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Provider events the workflow reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureEvent {
    Sent,
    Viewed,
    Completed {
        document_ref: String,
        completed_at: DateTime<Utc>,
    },
    Declined,
    Expired,
    Cancelled,
}

impl SignatureWebhook {
    /// Map the wire event type onto a workflow event.
    ///
    /// Unknown event types, and completed events missing their document
    /// reference, yield `None`: the webhook is acknowledged but produces no
    /// state change, so provider retries stay quiet.
    pub fn event(&self, received_at: DateTime<Utc>) -> Option<SignatureEvent> {
        match self.event_type.as_str() {
            "document_sent" => Some(SignatureEvent::Sent),
            "document_viewed" => Some(SignatureEvent::Viewed),
            "document_completed" => {
                let document_ref = self.completed_document_url.clone()?;
                Some(SignatureEvent::Completed {
                    document_ref,
                    completed_at: self.completed_at.unwrap_or(received_at),
                })
            }
            "document_declined" => Some(SignatureEvent::Declined),
            "document_expired" => Some(SignatureEvent::Expired),
            "document_cancelled" => Some(SignatureEvent::Cancelled),
            _ => None,
        }
    }
}

/// Verify the provider's HMAC-SHA256 signature over the raw payload.
///
/// The header carries the base64-encoded tag; comparison happens inside
/// `verify_slice` in constant time.
pub fn verify_signature(payload: &[u8], header: &str, secret: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    let Ok(expected) = BASE64.decode(header.trim()) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

/// Compute the header value for a payload. Shared with tests and the demo,
/// which play the provider's role.
pub fn sign_payload(payload: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    BASE64.encode(mac.finalize().into_bytes())
}

/// Outbound request asking the provider to collect a signature.
#[derive(Debug, Clone, Serialize)]
pub struct SigningRequest {
    pub letter_id: LetterId,
    pub signer_email: String,
    pub signer_name: String,
    pub subject: String,
    pub message: String,
}

/// Provider handle for the created envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderDocument {
    pub provider_document_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SignatureProviderError {
    #[error("signature provider HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("signature provider API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Boundary trait for the e-signature provider's outbound API.
#[async_trait]
pub trait SignatureProvider: Send + Sync {
    async fn create_signing_request(
        &self,
        request: &SigningRequest,
    ) -> Result<ProviderDocument, SignatureProviderError>;
}

/// JSON-over-HTTP signature provider client.
pub struct HttpSignatureProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpSignatureProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(SIGNATURE_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SignatureProvider for HttpSignatureProvider {
    async fn create_signing_request(
        &self,
        request: &SigningRequest,
    ) -> Result<ProviderDocument, SignatureProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SignatureProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<ProviderDocument>().await?)
    }
}
