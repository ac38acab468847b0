//! Beacon notification command.
//!
//! Reads one JSON request from stdin, validates it, and delivers the
//! resulting notification over the configured channels. The delivery report
//! is written to stdout as JSON; logs go to stderr.
//!
//! ```text
//! {"ticket": {"customerName": "...", ...}, "destination": "+15550100"}
//! {"alert": {"alertId": "...", "alertType": "...", "severity": "high", ...}}
//! {"inbound": {"ticketRef": "T-20240309-4821", "message": "...", ...}}
//! ```
//!
//! Exit status is 0 when the notification was delivered (or the inbound
//! message is valid), 1 when every channel failed, and 2 when the request
//! is invalid.

use std::{
    io::{self, Read},
    process::ExitCode,
};

use anyhow::{Context, Result};
use beacon_core::{
    validate_create_input, validate_inbound_message_input, AlertNotification, EventPayload,
    InboundMessageInput, Notification, Ticket, ValidationErrors,
};
use beacon_delivery::{Config, Notifier};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

/// What the caller asked for.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Command {
    /// Raw ticket creation input, validated before use.
    Ticket(serde_json::Value),
    /// Alert to forward as is.
    Alert(AlertNotification),
    /// Raw inbound message input; validated only.
    Inbound(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(flatten)]
    command: Command,
    /// Overrides the configured messaging destination.
    #[serde(default)]
    destination: Option<String>,
}

/// A request after validation.
#[derive(Debug)]
enum Prepared {
    Deliver(EventPayload),
    Inbound(InboundMessageInput),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = Config::load()?;
    init_tracing(&config.rust_log);

    let mut raw = String::new();
    io::stdin().read_to_string(&mut raw).context("Failed to read request from stdin")?;
    let request: Request = serde_json::from_str(&raw).context("Request is not valid JSON")?;

    let prepared = match prepare(request, &config.dashboard_base_url, Utc::now()) {
        Ok(prepared) => prepared,
        Err(errors) => {
            warn!(errors = errors.len(), "request rejected");
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "errors": errors }))?);
            return Ok(ExitCode::from(2));
        },
    };

    let payload = match prepared {
        Prepared::Deliver(payload) => payload,
        Prepared::Inbound(message) => {
            info!(ticket_ref = %message.ticket_ref, channel = %message.channel, "inbound message valid");
            println!("{}", serde_json::to_string_pretty(&message)?);
            return Ok(ExitCode::SUCCESS);
        },
    };

    let notifier = Notifier::from_config(&config)?;
    info!(
        channels = notifier.channels().len(),
        max_attempts = notifier.policy().max_attempts,
        "notifier ready"
    );

    let report = notifier.dispatch(payload).await.context("Delivery task panicked")?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.is_delivered() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Validates a request and turns it into something to deliver.
fn prepare(
    request: Request,
    dashboard_base_url: &str,
    now: DateTime<Utc>,
) -> std::result::Result<Prepared, ValidationErrors> {
    let notification = match request.command {
        Command::Ticket(raw) => {
            let ticket = Ticket::create(validate_create_input(&raw)?, now);
            info!(ticket_ref = %ticket.reference, ticket_id = %ticket.id, "ticket accepted");
            Notification::Ticket(ticket.to_notification(dashboard_base_url))
        },
        Command::Alert(alert) => Notification::Alert(alert),
        Command::Inbound(raw) => {
            return validate_inbound_message_input(&raw).map(Prepared::Inbound);
        },
    };

    let payload = EventPayload::new(notification, now);
    Ok(Prepared::Deliver(match request.destination {
        Some(destination) => payload.with_destination(destination),
        None => payload,
    }))
}

/// Initializes tracing; `RUST_LOG` wins over the configured filter.
fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
