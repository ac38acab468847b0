//! Channel sender capability.
//!
//! A channel is one external way of getting a notification to a human. Each
//! implementation performs exactly one attempt per `send` call and reports
//! the result as a [`SendOutcome`]; retries and fallback belong to the
//! engine.

use std::fmt;

use beacon_core::EventPayload;
use serde::Serialize;

use crate::error::DeliveryError;

/// Result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The channel accepted the notification.
    Sent {
        /// Identifier assigned by the provider, if it returned one
        provider_id: Option<String>,
    },
    /// The attempt failed and may be retried.
    Failed {
        /// Why the attempt failed
        error: DeliveryError,
    },
    /// The channel is not configured; nothing was sent.
    Disabled {
        /// Which setting is missing
        reason: String,
    },
}

impl SendOutcome {
    /// Whether the channel accepted the notification.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// One outbound delivery channel.
#[async_trait::async_trait]
pub trait ChannelSender: Send + Sync + fmt::Debug {
    /// Stable channel name used in logs and attempt records.
    fn name(&self) -> &str;

    /// Whether the channel has everything it needs to send.
    fn is_enabled(&self) -> bool;

    /// Makes a single delivery attempt.
    ///
    /// Must not panic or return early with an error: every failure is
    /// reported through the outcome. A disabled channel returns
    /// [`SendOutcome::Disabled`] without touching the network.
    async fn send(&self, payload: &EventPayload, attempt: u32) -> SendOutcome;
}

/// Static description of a configured channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelDescriptor {
    /// Channel name.
    pub name: String,
    /// Whether the channel's required settings are present.
    pub enabled: bool,
    /// Position in the fallback order (0 is tried first).
    pub position: usize,
}

impl fmt::Display for ChannelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.enabled { "enabled" } else { "disabled" };
        write!(f, "#{} {} ({state})", self.position, self.name)
    }
}

/// Describes `senders` in fallback order.
pub fn describe(senders: &[std::sync::Arc<dyn ChannelSender>]) -> Vec<ChannelDescriptor> {
    senders
        .iter()
        .enumerate()
        .map(|(position, sender)| ChannelDescriptor {
            name: sender.name().to_string(),
            enabled: sender.is_enabled(),
            position,
        })
        .collect()
}
