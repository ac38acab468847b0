//! Delivery events and observer traits.
//!
//! The delivery engine reports what it does (each attempt, each exhausted
//! channel, the final outcome) to a [`DeliveryObserver`] without knowing who
//! is listening. Observers exist for logging and audit only; they cannot
//! influence the delivery.
//!
//! ```text
//!                  AttemptFinished / ChannelExhausted
//! ┌──────────────┐        Delivered / Failed        ┌───────────────────┐
//! │ Notifier     │ ───────────────────────────────▶ │ MulticastObserver │
//! └──────────────┘                                  └───────────────────┘
//!                                                             │
//!                                            ┌────────────────┴──────┐
//!                                            ▼                       ▼
//!                                   ┌─────────────────┐   ┌────────────────────┐
//!                                   │ metrics, audit  │   │ RecordingObserver  │
//!                                   └─────────────────┘   └────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::models::{DeliveryAttempt, EventId};

/// Events emitted while delivering one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryEvent {
    /// One channel attempt finished.
    AttemptFinished(DeliveryAttempt),

    /// A channel used up its attempts without success.
    ChannelExhausted {
        /// Event being delivered.
        event_id: EventId,
        /// Channel that gave up.
        channel: String,
        /// Attempts made on the channel.
        attempts: u32,
    },

    /// The payload was accepted by a channel.
    Delivered {
        /// Event that was delivered.
        event_id: EventId,
        /// Channel that accepted it.
        channel: String,
        /// Identifier assigned by the provider, if any.
        provider_id: Option<String>,
    },

    /// Every channel was exhausted, or none was enabled.
    Failed {
        /// Event that could not be delivered.
        event_id: EventId,
        /// Number of channels tried.
        channels_tried: usize,
    },
}

/// Receives delivery events.
///
/// Implementations must not block; an observer that needs I/O should hand
/// the event off to its own task.
#[async_trait::async_trait]
pub trait DeliveryObserver: Send + Sync + std::fmt::Debug {
    /// Handles a delivery event.
    async fn on_event(&self, event: DeliveryEvent);
}

/// Observer that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpObserver;

#[async_trait::async_trait]
impl DeliveryObserver for NoOpObserver {
    async fn on_event(&self, _event: DeliveryEvent) {}
}

/// Forwards every event to all registered observers concurrently.
#[derive(Debug, Clone, Default)]
pub struct MulticastObserver {
    observers: Vec<Arc<dyn DeliveryObserver>>,
}

impl MulticastObserver {
    /// Creates a multicast observer with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber.
    pub fn add_subscriber(&mut self, observer: Arc<dyn DeliveryObserver>) {
        self.observers.push(observer);
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }
}

#[async_trait::async_trait]
impl DeliveryObserver for MulticastObserver {
    async fn on_event(&self, event: DeliveryEvent) {
        let futures = self.observers.iter().map(|observer| {
            let event = event.clone();
            async move { observer.on_event(event).await }
        });
        futures::future::join_all(futures).await;
    }
}

/// Keeps every event in memory, in arrival order.
///
/// Used to assert on engine behavior in tests and to collect audit trails.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<DeliveryEvent>>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<DeliveryEvent> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    /// Recorded attempt records only.
    pub fn attempts(&self) -> Vec<DeliveryAttempt> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DeliveryEvent::AttemptFinished(attempt) => Some(attempt),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl DeliveryObserver for RecordingObserver {
    async fn on_event(&self, event: DeliveryEvent) {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(event);
    }
}
