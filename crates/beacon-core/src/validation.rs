//! Validation and normalization of raw caller input.
//!
//! Both validators inspect every field and collect one message per invalid
//! field instead of stopping at the first problem. A successful result is
//! fully normalized (trimmed strings, lower-cased email); a failed result
//! carries only the messages, never a partially normalized value.

use serde_json::{Map, Value};

use crate::{
    error::ValidationErrors,
    models::{CreateTicketInput, InboundMessageInput, Priority},
};

/// Validates a raw create-ticket request body.
///
/// Required: `customerName`, `customerPhone`, `customerEmail`, `subject`,
/// `message`. Optional: `priority` (defaults to `medium`), which must be one
/// of the lowercase names exactly as written.
///
/// The email check only requires an `@`; anything stricter belongs to the
/// mail provider.
///
/// # Errors
///
/// Returns every field-level problem found, in field order.
pub fn validate_create_input(raw: &Value) -> Result<CreateTicketInput, ValidationErrors> {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);
    let mut errors = Vec::new();

    let customer_name = required(fields, "customerName", &mut errors);
    let customer_phone = required(fields, "customerPhone", &mut errors);
    let customer_email = match required(fields, "customerEmail", &mut errors) {
        Some(email) if email.contains('@') => Some(email.to_lowercase()),
        Some(_) => {
            errors.push("customerEmail must be a valid email address".to_string());
            None
        },
        None => None,
    };
    let subject = required(fields, "subject", &mut errors);
    let message = required(fields, "message", &mut errors);
    let priority = match present(fields, "priority") {
        None => Some(Priority::default()),
        Some(value) => match value.as_str().map(str::parse::<Priority>) {
            Some(Ok(priority)) => Some(priority),
            _ => {
                errors.push(format!("priority must be one of: {}", priority_list()));
                None
            },
        },
    };

    if let Some(errors) = ValidationErrors::from_messages(errors) {
        return Err(errors);
    }

    match (customer_name, customer_phone, customer_email, subject, message, priority) {
        (
            Some(customer_name),
            Some(customer_phone),
            Some(customer_email),
            Some(subject),
            Some(message),
            Some(priority),
        ) => Ok(CreateTicketInput {
            customer_name,
            customer_phone,
            customer_email,
            subject,
            message,
            priority,
        }),
        // Every `None` above pushed a message, so this arm is unreachable.
        _ => Err(internal_inconsistency()),
    }
}

/// Validates a raw inbound channel message.
///
/// Required: `ticketRef`, `message`, `from`, `channel`. Optional:
/// `externalId`, `mediaUrl`, which must be strings when present. A blank
/// optional string is treated as absent.
///
/// # Errors
///
/// Returns every field-level problem found, in field order.
pub fn validate_inbound_message_input(
    raw: &Value,
) -> Result<InboundMessageInput, ValidationErrors> {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);
    let mut errors = Vec::new();

    let ticket_ref = required(fields, "ticketRef", &mut errors);
    let message = required(fields, "message", &mut errors);
    let from = required(fields, "from", &mut errors);
    let channel = required(fields, "channel", &mut errors);
    let external_id = optional_string(fields, "externalId", &mut errors);
    let media_url = optional_string(fields, "mediaUrl", &mut errors);

    if let Some(errors) = ValidationErrors::from_messages(errors) {
        return Err(errors);
    }

    match (ticket_ref, message, from, channel) {
        (Some(ticket_ref), Some(message), Some(from), Some(channel)) => Ok(InboundMessageInput {
            ticket_ref,
            message,
            from,
            channel,
            external_id: external_id.flatten(),
            media_url: media_url.flatten(),
        }),
        _ => Err(internal_inconsistency()),
    }
}

/// Returns the field unless it is absent or JSON `null`.
fn present<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|value| !value.is_null())
}

/// Trimmed non-empty string field, or records "`name` is required".
fn required(fields: &Map<String, Value>, name: &str, errors: &mut Vec<String>) -> Option<String> {
    let value = present(fields, name).and_then(Value::as_str).map(str::trim);
    match value {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => {
            errors.push(format!("{name} is required"));
            None
        },
    }
}

/// `Some(None)` when absent or blank, `Some(Some(s))` for a trimmed string,
/// `None` plus a recorded error for any other JSON type.
fn optional_string(
    fields: &Map<String, Value>,
    name: &str,
    errors: &mut Vec<String>,
) -> Option<Option<String>> {
    match present(fields, name) {
        None => Some(None),
        Some(Value::String(value)) => {
            let value = value.trim();
            Some((!value.is_empty()).then(|| value.to_string()))
        },
        Some(_) => {
            errors.push(format!("{name} must be a string"));
            None
        },
    }
}

fn priority_list() -> String {
    Priority::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
}

fn internal_inconsistency() -> ValidationErrors {
    ValidationErrors::single("input could not be validated")
}
