//! Property-based tests for ticket references and input validation.
//!
//! Generates arbitrary (but well-formed) ticket requests and checks that
//! normalization and error collection hold for all of them, not just the
//! handful of fixtures in the unit tests.

#![allow(clippy::unwrap_used)]

use beacon_core::{validate_create_input, Priority, TicketRef};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const REQUIRED: [&str; 5] = ["customerName", "customerPhone", "customerEmail", "subject", "message"];

fn padding() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["", " ", "  ", "\t", "\n ", " \t "]).prop_map(str::to_string)
}

fn word() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 .,+-]{0,20}[A-Za-z0-9]"
}

fn email() -> impl Strategy<Value = String> {
    ("[A-Za-z0-9._]{1,12}", "[A-Za-z0-9]{1,10}\\.[A-Za-z]{2,4}")
        .prop_map(|(local, domain)| format!("{local}@{domain}"))
}

fn padded(core: impl Strategy<Value = String>) -> impl Strategy<Value = (String, String)> {
    (padding(), core, padding()).prop_map(|(left, core, right)| {
        let raw = format!("{left}{core}{right}");
        (raw, core)
    })
}

fn priority() -> impl Strategy<Value = Priority> {
    prop::sample::select(Priority::ALL.to_vec())
}

/// How a required field is left out of a request.
#[derive(Debug, Clone)]
enum Missing {
    Absent,
    Null,
    Blank(String),
}

fn missing() -> impl Strategy<Value = Missing> {
    prop_oneof![
        Just(Missing::Absent),
        Just(Missing::Null),
        padding().prop_map(Missing::Blank),
    ]
}

proptest! {
    #[test]
    fn valid_input_is_trimmed_and_lowercased(
        name in padded(word()),
        phone in padded(word()),
        email in padded(email()),
        subject in padded(word()),
        message in padded(word()),
        priority in priority(),
    ) {
        let raw = json!({
            "customerName": name.0,
            "customerPhone": phone.0,
            "customerEmail": email.0,
            "subject": subject.0,
            "message": message.0,
            "priority": priority.as_str(),
        });

        let input = validate_create_input(&raw).unwrap();

        prop_assert_eq!(input.customer_name, name.1);
        prop_assert_eq!(input.customer_phone, phone.1);
        prop_assert_eq!(input.customer_email, email.1.to_lowercase());
        prop_assert_eq!(input.subject, subject.1);
        prop_assert_eq!(input.message, message.1);
        prop_assert_eq!(input.priority, priority);
    }

    #[test]
    fn error_count_matches_missing_required_fields(
        omitted in prop::collection::vec(prop::option::of(missing()), REQUIRED.len()),
    ) {
        let mut fields = Map::new();
        for (name, omission) in REQUIRED.iter().zip(&omitted) {
            let value = match omission {
                Some(Missing::Absent) => continue,
                Some(Missing::Null) => Value::Null,
                Some(Missing::Blank(blank)) => Value::String(blank.clone()),
                None if *name == "customerEmail" => Value::String("ops@example.com".to_string()),
                None => Value::String(format!("{name} value")),
            };
            fields.insert((*name).to_string(), value);
        }

        let expected = omitted.iter().filter(|o| o.is_some()).count();
        match validate_create_input(&Value::Object(fields)) {
            Ok(_) => prop_assert_eq!(expected, 0),
            Err(errors) => prop_assert_eq!(errors.len(), expected),
        }
    }

    #[test]
    fn generated_reference_has_fixed_shape(
        secs in 0i64..4_102_444_800,
    ) {
        let now = Utc.timestamp_opt(secs, 0).unwrap();
        let reference = TicketRef::generate(now);
        let text = reference.to_string();

        prop_assert_eq!(text.len(), 15);
        prop_assert!(text.starts_with("T-"));
        prop_assert_eq!(&text[2..10], now.format("%Y%m%d").to_string());
        prop_assert!(text[11..].bytes().all(|b| b.is_ascii_digit()));
        prop_assert_eq!(text.parse::<TicketRef>().unwrap(), reference);
    }

    #[test]
    fn priority_must_match_lowercase_name_exactly(
        priority in priority(),
        left in padding(),
        right in padding(),
    ) {
        let written = format!("{left}{}{right}", priority.as_str().to_uppercase());
        let raw = json!({
            "customerName": "Ada",
            "customerPhone": "+15550100",
            "customerEmail": "ada@example.com",
            "subject": "Login",
            "message": "Cannot log in",
            "priority": written,
        });

        let errors = validate_create_input(&raw).unwrap_err();
        prop_assert_eq!(errors.messages(), ["priority must be one of: low, medium, high, urgent"]);
    }
}
