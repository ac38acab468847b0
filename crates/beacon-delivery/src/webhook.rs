//! Webhook channel: signed JSON POST to an automation pipeline.
//!
//! The notification is posted as JSON to the configured URL. When a shared
//! secret is configured it is sent verbatim in `x-api-key`, and an
//! HMAC-SHA256 of the body is sent in `x-beacon-signature` so the receiver
//! can also verify integrity. Only HTTP 200 and 201 count as accepted.

use beacon_core::EventPayload;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::{
    channel::{ChannelSender, SendOutcome},
    client::{HttpClient, HttpRequest, RequestBody},
    error::DeliveryError,
};

type HmacSha256 = Hmac<Sha256>;

/// Channel name used in logs and attempt records.
pub const WEBHOOK_CHANNEL: &str = "webhook";

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying `sha256=<hex>` of the request body.
pub const SIGNATURE_HEADER: &str = "x-beacon-signature";

/// Settings required to enable the webhook channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    /// Endpoint URL.
    pub url: String,
    /// Shared secret; requests are unsigned when absent.
    pub api_key: Option<String>,
}

/// Sender for the webhook channel.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    settings: Option<WebhookSettings>,
    client: HttpClient,
}

impl WebhookSender {
    /// Creates the sender; `None` settings yield a disabled channel.
    pub fn new(settings: Option<WebhookSettings>, client: HttpClient) -> Self {
        Self { settings, client }
    }

    async fn post(
        &self,
        settings: &WebhookSettings,
        payload: &EventPayload,
        attempt: u32,
    ) -> SendOutcome {
        let body = match serde_json::to_vec(&payload.notification().webhook_body()) {
            Ok(body) => Bytes::from(body),
            Err(e) => {
                return SendOutcome::Failed {
                    error: DeliveryError::configuration(format!("failed to encode payload: {e}")),
                };
            },
        };

        let mut headers = vec![
            ("x-beacon-event-id".to_string(), payload.event_id().to_string()),
            ("x-beacon-attempt".to_string(), attempt.to_string()),
        ];
        if let Some(secret) = &settings.api_key {
            let signature = match sign(secret, &body) {
                Ok(signature) => signature,
                Err(error) => return SendOutcome::Failed { error },
            };
            headers.push((API_KEY_HEADER.to_string(), secret.clone()));
            headers.push((SIGNATURE_HEADER.to_string(), signature));
        }

        let request = HttpRequest {
            url: settings.url.clone(),
            headers,
            basic_auth: None,
            body: RequestBody::Raw { body, content_type: "application/json".to_string() },
        };

        match self.client.post(request).await {
            Ok(response) if matches!(response.status_code, 200 | 201) => {
                debug!(status = response.status_code, "webhook accepted notification");
                SendOutcome::Sent { provider_id: response.json_field("id") }
            },
            Ok(response) => {
                warn!(status = response.status_code, "webhook rejected notification");
                SendOutcome::Failed {
                    error: DeliveryError::unexpected_status(response.status_code, response.body),
                }
            },
            Err(error) => SendOutcome::Failed { error },
        }
    }
}

#[async_trait::async_trait]
impl ChannelSender for WebhookSender {
    fn name(&self) -> &str {
        WEBHOOK_CHANNEL
    }

    fn is_enabled(&self) -> bool {
        self.settings.is_some()
    }

    async fn send(&self, payload: &EventPayload, attempt: u32) -> SendOutcome {
        match &self.settings {
            Some(settings) => self.post(settings, payload, attempt).await,
            None => SendOutcome::Disabled { reason: "webhook URL not configured".to_string() },
        }
    }
}

/// Computes the `sha256=<hex>` signature of `body` under `secret`.
///
/// # Errors
///
/// Returns `DeliveryError::ConfigurationError` if the secret is not a usable
/// HMAC key.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, DeliveryError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| DeliveryError::configuration("invalid webhook signing secret"))?;

    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}
