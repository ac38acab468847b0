//! Delivery orchestration with retries and channel fallback.
//!
//! The [`Notifier`] tries its channels strictly in order. Each channel gets
//! the full retry budget of the policy; once a channel is exhausted the next
//! one is tried, and the first acceptance ends the delivery.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  retry policy  ┌─────────┐  exhausted  ┌───────────┐
//! │ Notifier │ ─────────────▶ │ webhook │ ──────────▶ │ messaging │ ──▶ Failed
//! └──────────┘                └─────────┘             └───────────┘
//!                                  │ accepted               │ accepted
//!                                  ▼                        ▼
//!                              Delivered                Delivered
//! ```
//!
//! Delivery never returns an error. Everything that happened is captured in
//! the [`DeliveryReport`] and streamed to the [`DeliveryObserver`].

use std::sync::{Arc, Mutex};

use beacon_core::{
    AttemptStatus, Clock, DeliveryAttempt, DeliveryEvent, DeliveryObserver, EventId, EventPayload,
    NoOpObserver, RealClock,
};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    channel::{describe, ChannelDescriptor, ChannelSender, SendOutcome},
    client::HttpClient,
    config::Config,
    error::{DeliveryError, ErrorCategory, Result},
    messaging::MessagingSender,
    retry::{RetryDecision, RetryOutcome, RetryPolicy},
    webhook::WebhookSender,
};

/// Final result of delivering one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// A channel accepted the notification.
    Delivered {
        /// Channel that accepted it.
        channel: String,
        /// Identifier assigned by the provider, if any.
        provider_id: Option<String>,
    },
    /// No channel accepted the notification.
    Failed,
}

/// Everything that happened while delivering one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Event that was delivered.
    pub event_id: EventId,
    /// Final outcome.
    pub outcome: DeliveryOutcome,
    /// Every attempt in the order it was made, across all channels.
    pub attempts: Vec<DeliveryAttempt>,
}

impl DeliveryReport {
    /// Whether some channel accepted the notification.
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Delivered { .. })
    }
}

/// What a channel's retry loop ended with when it did not fail outright.
enum Accepted {
    Sent(Option<String>),
    Disabled(String),
}

/// Delivers notifications over an ordered list of channels.
#[derive(Debug, Clone)]
pub struct Notifier {
    senders: Vec<Arc<dyn ChannelSender>>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn DeliveryObserver>,
}

impl Notifier {
    /// Creates a notifier trying `senders` in order, on the real clock and
    /// with no observer.
    pub fn new(senders: Vec<Arc<dyn ChannelSender>>, policy: RetryPolicy) -> Self {
        Self { senders, policy, clock: Arc::new(RealClock::new()), observer: Arc::new(NoOpObserver) }
    }

    /// Builds the production channel list from configuration.
    ///
    /// The webhook is tried first and messaging second. Disabled channels
    /// are logged once here and left out; with notifications disabled the
    /// list is empty and every delivery fails immediately.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the HTTP client cannot
    /// be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let policy = config.to_retry_policy();
        if !config.notifications_enabled() {
            info!("notifications disabled, no channels configured");
            return Ok(Self::new(Vec::new(), policy));
        }

        let client = HttpClient::new(config.to_client_config())?;
        let candidates: Vec<Arc<dyn ChannelSender>> = vec![
            Arc::new(WebhookSender::new(config.webhook_settings(), client.clone())),
            Arc::new(MessagingSender::new(config.messaging_settings(), client)),
        ];

        for descriptor in describe(&candidates) {
            if descriptor.enabled {
                info!(channel = %descriptor.name, position = descriptor.position, "channel enabled");
            } else {
                warn!(channel = %descriptor.name, "channel disabled, missing configuration");
            }
        }

        let senders = candidates.into_iter().filter(|sender| sender.is_enabled()).collect();
        Ok(Self::new(senders, policy))
    }

    /// Replaces the clock used for backoff waits and timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the delivery observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DeliveryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Channels in fallback order.
    pub fn channels(&self) -> Vec<ChannelDescriptor> {
        describe(&self.senders)
    }

    /// Retry policy applied to every channel.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Delivers `payload` in the background.
    ///
    /// The caller's own work is never held up by slow channels or backoff
    /// waits. Must be called from within a tokio runtime.
    pub fn dispatch(&self, payload: EventPayload) -> JoinHandle<DeliveryReport> {
        let notifier = self.clone();
        tokio::spawn(async move { notifier.deliver(payload).await })
    }

    /// Delivers `payload`, trying channels in order until one accepts it.
    pub async fn deliver(&self, payload: EventPayload) -> DeliveryReport {
        let event_id = payload.event_id();
        let attempts = Mutex::new(Vec::new());

        info!(
            event_id = %event_id,
            kind = payload.notification().kind(),
            subject = %payload.notification().subject_id(),
            channels = self.senders.len(),
            "delivering notification"
        );

        for (position, sender) in self.senders.iter().enumerate() {
            let span = info_span!("channel", channel = sender.name(), position, event_id = %event_id);
            let outcome = self.run_channel(sender, &payload, &attempts).instrument(span).await;

            match outcome {
                RetryOutcome::Succeeded { value: Accepted::Sent(provider_id), attempts: tries } => {
                    info!(
                        event_id = %event_id,
                        channel = sender.name(),
                        attempts = tries,
                        provider_id = provider_id.as_deref().unwrap_or("-"),
                        "notification delivered"
                    );
                    self.observer
                        .on_event(DeliveryEvent::Delivered {
                            event_id,
                            channel: sender.name().to_string(),
                            provider_id: provider_id.clone(),
                        })
                        .await;

                    return DeliveryReport {
                        event_id,
                        outcome: DeliveryOutcome::Delivered {
                            channel: sender.name().to_string(),
                            provider_id,
                        },
                        attempts: into_records(attempts),
                    };
                },
                RetryOutcome::Succeeded { value: Accepted::Disabled(reason), attempts: tries } => {
                    warn!(
                        event_id = %event_id,
                        channel = sender.name(),
                        reason = %reason,
                        "channel disabled, falling back"
                    );
                    self.channel_exhausted(event_id, sender.name(), tries).await;
                },
                RetryOutcome::Exhausted { last_error, attempts: tries } => {
                    warn!(
                        event_id = %event_id,
                        channel = sender.name(),
                        attempts = tries,
                        category = %ErrorCategory::from(&last_error),
                        error = %last_error,
                        "channel exhausted, falling back"
                    );
                    self.channel_exhausted(event_id, sender.name(), tries).await;
                },
            }
        }

        error!(event_id = %event_id, channels_tried = self.senders.len(), "all channels failed");
        self.observer
            .on_event(DeliveryEvent::Failed { event_id, channels_tried: self.senders.len() })
            .await;

        DeliveryReport { event_id, outcome: DeliveryOutcome::Failed, attempts: into_records(attempts) }
    }

    /// Runs one channel under the retry policy, recording every attempt.
    ///
    /// A disabled channel ends the loop after its first attempt.
    async fn run_channel(
        &self,
        sender: &Arc<dyn ChannelSender>,
        payload: &EventPayload,
        records: &Mutex<Vec<DeliveryAttempt>>,
    ) -> RetryOutcome<Accepted, DeliveryError> {
        self.policy
            .run(
                self.clock.as_ref(),
                move |attempt| async move {
                    let outcome = sender.send(payload, attempt).await;
                    let attempted_at = self.clock.now_utc();

                    let (status, error, wait_before_next, result) = match outcome {
                        SendOutcome::Sent { provider_id } => {
                            (AttemptStatus::Succeeded, None, None, Ok(Accepted::Sent(provider_id)))
                        },
                        SendOutcome::Disabled { reason } => (
                            AttemptStatus::Disabled,
                            Some(DeliveryError::disabled(sender.name(), reason.as_str()).to_string()),
                            None,
                            Ok(Accepted::Disabled(reason)),
                        ),
                        SendOutcome::Failed { error } => {
                            let wait = match self.policy.decide(attempt) {
                                RetryDecision::Retry { delay } => Some(delay),
                                RetryDecision::GiveUp { .. } => None,
                            };
                            (AttemptStatus::Failed, Some(error.to_string()), wait, Err(error))
                        },
                    };

                    let record = DeliveryAttempt {
                        event_id: payload.event_id(),
                        channel: sender.name().to_string(),
                        attempt_number: attempt,
                        status,
                        error,
                        wait_before_next,
                        attempted_at,
                    };
                    records.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(record.clone());
                    self.observer.on_event(DeliveryEvent::AttemptFinished(record)).await;

                    result
                },
                |attempt, error, wait| match wait {
                    Some(delay) => warn!(
                        attempt,
                        category = %ErrorCategory::from(error),
                        error = %error,
                        retry_in_ms = delay.as_millis(),
                        "attempt failed, retrying"
                    ),
                    None => warn!(
                        attempt,
                        category = %ErrorCategory::from(error),
                        error = %error,
                        "attempt failed, giving up on channel"
                    ),
                },
            )
            .await
    }

    async fn channel_exhausted(&self, event_id: EventId, channel: &str, attempts: u32) {
        self.observer
            .on_event(DeliveryEvent::ChannelExhausted {
                event_id,
                channel: channel.to_string(),
                attempts,
            })
            .await;
    }
}

fn into_records(records: Mutex<Vec<DeliveryAttempt>>) -> Vec<DeliveryAttempt> {
    records.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
}
