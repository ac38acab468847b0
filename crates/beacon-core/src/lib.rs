//! Core domain models for Beacon notifications.
//!
//! Provides ticket identity, input validation, notification payloads, the
//! delivery event vocabulary and clock abstractions shared by the delivery
//! engine. Nothing in this crate performs network I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod models;
pub mod reference;
pub mod time;
pub mod validation;

pub use error::{CoreError, ValidationErrors};
pub use events::{
    DeliveryEvent, DeliveryObserver, MulticastObserver, NoOpObserver, RecordingObserver,
};
pub use models::{
    AlertNotification, AlertStatus, AttemptStatus, CreateTicketInput, DeliveryAttempt, EventId,
    EventPayload, InboundMessageInput, Notification, Priority, Severity, Ticket, TicketId,
    TicketNotification,
};
pub use reference::TicketRef;
pub use time::{Clock, RealClock, TestClock};
pub use validation::{validate_create_input, validate_inbound_message_input};
