//! Core domain models and strongly-typed identifiers.
//!
//! Defines tickets, alerts, the immutable event payload handed to the
//! delivery engine, and the per-attempt records the engine produces while
//! delivering it.

use std::{fmt, str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::CoreError, reference::TicketRef};

/// Strongly-typed event identifier.
///
/// Every payload handed to the delivery engine carries one, so log lines and
/// attempt records from a single delivery can be correlated.
///
/// # Example
///
/// ```
/// use beacon_core::models::EventId;
/// let event_id = EventId::new();
/// println!("Delivering event: {}", event_id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Internal ticket identifier, distinct from the human-facing [`TicketRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub Uuid);

impl TicketId {
    /// Creates a new random ticket ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TicketId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Ticket priority as chosen by the customer or agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Default when the caller does not choose.
    #[default]
    Medium,
    /// Needs attention today.
    High,
    /// Needs attention now.
    Urgent,
}

impl Priority {
    /// All accepted priorities in ascending order.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(CoreError::InvalidValue { field: "priority", value: s.to_string() }),
        }
    }
}

/// Alert severity, highest last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Low impact.
    Low,
    /// Degraded service.
    Medium,
    /// Significant impact.
    High,
    /// Outage or data at risk.
    Critical,
}

impl Severity {
    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Status marker prefixed to rendered messages.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Info => "ℹ️",
            Self::Low => "🟢",
            Self::Medium => "🟡",
            Self::High => "🟠",
            Self::Critical => "🔴",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(CoreError::InvalidValue { field: "severity", value: s.to_string() }),
        }
    }
}

/// Lifecycle state of an alert at the time it is announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Threshold crossed.
    #[default]
    Triggered,
    /// Back to normal.
    Resolved,
}

/// Normalized input for creating a support ticket.
///
/// Only produced by [`crate::validate_create_input`]; every string is trimmed
/// and the email is lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketInput {
    /// Customer display name.
    pub customer_name: String,
    /// Customer phone number as entered.
    pub customer_phone: String,
    /// Lower-cased customer email.
    pub customer_email: String,
    /// Short summary line.
    pub subject: String,
    /// Free-text body.
    pub message: String,
    /// Requested priority.
    pub priority: Priority,
}

/// Normalized input for a message arriving on an external channel for an
/// existing ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessageInput {
    /// Reference of the ticket the message belongs to.
    pub ticket_ref: String,
    /// Message text.
    pub message: String,
    /// Sender address on the channel.
    pub from: String,
    /// Channel the message arrived on.
    pub channel: String,
    /// Provider-assigned message id.
    pub external_id: Option<String>,
    /// Attached media location.
    pub media_url: Option<String>,
}

/// A support ticket as created by the intake path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Internal identifier.
    pub id: TicketId,
    /// Human-facing reference, assigned once at creation.
    pub reference: TicketRef,
    /// Validated creation input.
    pub input: CreateTicketInput,
    /// When the ticket was created.
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Creates a ticket, assigning a fresh id and reference for `created_at`.
    pub fn create(input: CreateTicketInput, created_at: DateTime<Utc>) -> Self {
        Self { id: TicketId::new(), reference: TicketRef::generate(created_at), input, created_at }
    }

    /// Builds the webhook wire payload for this ticket.
    ///
    /// The ticket URL points at the dashboard detail page under
    /// `dashboard_base_url`.
    pub fn to_notification(&self, dashboard_base_url: &str) -> TicketNotification {
        let base = dashboard_base_url.trim_end_matches('/');
        TicketNotification {
            ticket_ref: self.reference.to_string(),
            ticket_id: self.id.to_string(),
            ticket_url: format!("{base}/tickets/{}", self.id),
            customer_name: self.input.customer_name.clone(),
            customer_phone: self.input.customer_phone.clone(),
            customer_email: self.input.customer_email.clone(),
            subject: self.input.subject.clone(),
            message: self.input.message.clone(),
            priority: self.input.priority,
            created_at: self.created_at,
        }
    }
}

/// Ticket-created notification, serialized as the webhook JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketNotification {
    /// Human-facing reference.
    pub ticket_ref: String,
    /// Internal identifier.
    pub ticket_id: String,
    /// Dashboard link.
    pub ticket_url: String,
    /// Customer display name.
    pub customer_name: String,
    /// Customer phone number.
    pub customer_phone: String,
    /// Customer email.
    pub customer_email: String,
    /// Short summary line.
    pub subject: String,
    /// Free-text body.
    pub message: String,
    /// Requested priority.
    pub priority: Priority,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Triggered or resolved alert notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertNotification {
    /// Alert identifier.
    pub alert_id: String,
    /// Kind of alert, e.g. `cpu` or `disk`.
    pub alert_type: String,
    /// Alert severity.
    pub severity: Severity,
    /// Whether the alert fired or cleared.
    #[serde(default)]
    pub status: AlertStatus,
    /// Affected entity (host, service, account).
    pub entity: String,
    /// Free-text body.
    pub message: String,
    /// When the alert fired.
    pub triggered_at: DateTime<Utc>,
}

/// Something worth telling a human about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Notification {
    /// A new support ticket.
    Ticket(TicketNotification),
    /// An alert state change.
    Alert(AlertNotification),
}

impl Notification {
    /// Short name of the notification kind for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ticket(_) => "ticket",
            Self::Alert(_) => "alert",
        }
    }

    /// Identifier of the ticket or alert this notification is about.
    pub fn subject_id(&self) -> &str {
        match self {
            Self::Ticket(ticket) => &ticket.ticket_id,
            Self::Alert(alert) => &alert.alert_id,
        }
    }

    /// JSON body posted to webhook channels.
    pub fn webhook_body(&self) -> serde_json::Value {
        let value = match self {
            Self::Ticket(ticket) => serde_json::to_value(ticket),
            Self::Alert(alert) => serde_json::to_value(alert),
        };
        // Plain structs with string keys always serialize.
        value.unwrap_or(serde_json::Value::Null)
    }

    /// Multi-line text for chat-style messaging channels.
    pub fn render_text(&self) -> String {
        match self {
            Self::Ticket(ticket) => format!(
                "🎫 *New Support Ticket* {reference}\n\
                 Priority: {priority}\n\
                 Customer: {name} ({phone}, {email})\n\
                 Subject: {subject}\n\
                 Time: {time}\n\
                 \n\
                 {message}\n\
                 \n\
                 ID: {id}",
                reference = ticket.ticket_ref,
                priority = ticket.priority.as_str().to_uppercase(),
                name = ticket.customer_name,
                phone = ticket.customer_phone,
                email = ticket.customer_email,
                subject = ticket.subject,
                time = ticket.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                message = ticket.message,
                id = ticket.ticket_id,
            ),
            Self::Alert(alert) => {
                let (marker, headline) = match alert.status {
                    AlertStatus::Triggered => (
                        alert.severity.marker(),
                        format!("{} ALERT", alert.severity.as_str().to_uppercase()),
                    ),
                    AlertStatus::Resolved => (
                        "✅",
                        format!("RESOLVED {} ALERT", alert.severity.as_str().to_uppercase()),
                    ),
                };
                format!(
                    "{marker} *{headline}*\n\
                     Type: {alert_type}\n\
                     Entity: {entity}\n\
                     Time: {time}\n\
                     \n\
                     {message}\n\
                     \n\
                     ID: {id}",
                    alert_type = alert.alert_type,
                    entity = alert.entity,
                    time = alert.triggered_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    message = alert.message,
                    id = alert.alert_id,
                )
            },
        }
    }
}

/// Immutable description of one thing to deliver.
///
/// Created once per triggering event and owned by the delivery call that
/// received it. Fields are read through accessors so a payload cannot change
/// between channel attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventPayload {
    event_id: EventId,
    destination: Option<String>,
    created_at: DateTime<Utc>,
    notification: Notification,
}

impl EventPayload {
    /// Wraps a notification in a new payload with a fresh event id.
    pub fn new(notification: Notification, created_at: DateTime<Utc>) -> Self {
        Self { event_id: EventId::new(), destination: None, created_at, notification }
    }

    /// Overrides the configured destination address for channels that
    /// address a recipient directly.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Event identifier.
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Destination override, if any.
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// When the payload was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The notification to deliver.
    pub fn notification(&self) -> &Notification {
        &self.notification
    }
}

/// Outcome of a single channel attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// The channel accepted the notification.
    Succeeded,
    /// The channel call failed.
    Failed,
    /// The channel is not configured; no call was made.
    Disabled,
}

/// Record of one attempt on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    /// Event being delivered.
    pub event_id: EventId,
    /// Channel name.
    pub channel: String,
    /// Attempt number on this channel (1-based).
    pub attempt_number: u32,
    /// Attempt outcome.
    pub status: AttemptStatus,
    /// Error detail for failed or disabled attempts.
    pub error: Option<String>,
    /// Backoff applied before the next attempt on the same channel.
    pub wait_before_next: Option<Duration>,
    /// When the attempt finished.
    pub attempted_at: DateTime<Utc>,
}

impl DeliveryAttempt {
    /// Whether this attempt delivered the notification.
    pub fn is_success(&self) -> bool {
        self.status == AttemptStatus::Succeeded
    }
}
