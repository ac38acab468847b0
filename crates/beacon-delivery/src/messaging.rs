//! Direct messaging channel through a Twilio-style Messages API.
//!
//! Sends the rendered notification text to a phone-number-like address.
//! Providers that multiplex several networks on one API (WhatsApp, SMS)
//! expect addresses with a network prefix such as `whatsapp:+15550100`;
//! both the source and the destination are prefixed here when the caller
//! has not done so already.

use beacon_core::EventPayload;
use tracing::{debug, warn};

use crate::{
    channel::{ChannelSender, SendOutcome},
    client::{HttpClient, HttpRequest, RequestBody},
    error::DeliveryError,
};

/// Channel name used in logs and attempt records.
pub const MESSAGING_CHANNEL: &str = "messaging";

/// Default provider API root.
pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Default address prefix for the provider.
pub const DEFAULT_ADDRESS_PREFIX: &str = "whatsapp:";

/// Settings required to enable the messaging channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingSettings {
    /// API root, without trailing slash.
    pub api_base: String,
    /// Account identifier, also the basic-auth username.
    pub account_sid: String,
    /// Basic-auth password.
    pub auth_token: String,
    /// Source address messages are sent from.
    pub from: String,
    /// Destination used when the payload carries none.
    pub default_to: Option<String>,
    /// Network prefix applied to addresses; empty disables prefixing.
    pub address_prefix: String,
}

impl MessagingSettings {
    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

/// Sender for the messaging channel.
#[derive(Debug, Clone)]
pub struct MessagingSender {
    settings: Option<MessagingSettings>,
    client: HttpClient,
}

impl MessagingSender {
    /// Creates the sender; `None` settings yield a disabled channel.
    pub fn new(settings: Option<MessagingSettings>, client: HttpClient) -> Self {
        Self { settings, client }
    }

    async fn post(&self, settings: &MessagingSettings, payload: &EventPayload) -> SendOutcome {
        let Some(to) = payload.destination().or(settings.default_to.as_deref()) else {
            return SendOutcome::Failed {
                error: DeliveryError::configuration("no destination address for messaging channel"),
            };
        };

        let to = normalize_address(to, &settings.address_prefix);
        let from = normalize_address(&settings.from, &settings.address_prefix);
        debug!(to = %to, from = %from, "sending provider message");

        let request = HttpRequest {
            url: settings.messages_url(),
            headers: Vec::new(),
            basic_auth: Some((settings.account_sid.clone(), settings.auth_token.clone())),
            body: RequestBody::Form(vec![
                ("From".to_string(), from),
                ("To".to_string(), to),
                ("Body".to_string(), payload.notification().render_text()),
            ]),
        };

        match self.client.post(request).await {
            Ok(response) if matches!(response.status_code, 200 | 201) => {
                SendOutcome::Sent { provider_id: response.json_field("sid") }
            },
            Ok(response) => {
                warn!(status = response.status_code, "provider rejected message");
                SendOutcome::Failed {
                    error: DeliveryError::unexpected_status(response.status_code, response.body),
                }
            },
            Err(error) => SendOutcome::Failed { error },
        }
    }
}

#[async_trait::async_trait]
impl ChannelSender for MessagingSender {
    fn name(&self) -> &str {
        MESSAGING_CHANNEL
    }

    fn is_enabled(&self) -> bool {
        self.settings.is_some()
    }

    async fn send(&self, payload: &EventPayload, _attempt: u32) -> SendOutcome {
        match &self.settings {
            Some(settings) => self.post(settings, payload).await,
            None => SendOutcome::Disabled {
                reason: "messaging credentials or source address not configured".to_string(),
            },
        }
    }
}

/// Prefixes `address` with `prefix` unless it already carries it.
///
/// Surrounding whitespace is dropped. Applying the function twice gives the
/// same result as applying it once.
pub fn normalize_address(address: &str, prefix: &str) -> String {
    let address = address.trim();
    if prefix.is_empty() || address.starts_with(prefix) {
        address.to_string()
    } else {
        format!("{prefix}{address}")
    }
}
