//! Integration tests for the webhook channel against a mock endpoint.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use beacon_core::{CreateTicketInput, EventPayload, Notification, Priority, Ticket};
use beacon_delivery::{
    client::{ClientConfig, HttpClient},
    webhook::{sign, WebhookSender, WebhookSettings, API_KEY_HEADER, SIGNATURE_HEADER},
    ChannelSender, DeliveryError, SendOutcome,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn ticket_payload() -> EventPayload {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap();
    let ticket = Ticket::create(
        CreateTicketInput {
            customer_name: "Ada Lovelace".to_string(),
            customer_phone: "+44 20 7946 0000".to_string(),
            customer_email: "ada@example.com".to_string(),
            subject: "Cannot log in".to_string(),
            message: "Password reset link expired".to_string(),
            priority: Priority::High,
        },
        created_at,
    );

    EventPayload::new(
        Notification::Ticket(ticket.to_notification("https://support.example.com/")),
        created_at,
    )
}

fn sender(url: String, api_key: Option<&str>) -> WebhookSender {
    WebhookSender::new(
        Some(WebhookSettings { url, api_key: api_key.map(str::to_string) }),
        HttpClient::with_defaults().unwrap(),
    )
}

#[tokio::test]
async fn posts_ticket_body_with_secret_and_signature() {
    let mock_server = MockServer::start().await;
    let payload = ticket_payload();
    let body = serde_json::to_vec(&payload.notification().webhook_body()).unwrap();
    let signature = sign("topsecret", &body).unwrap();

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/automation"))
        .and(matchers::header(API_KEY_HEADER, "topsecret"))
        .and(matchers::header(SIGNATURE_HEADER, signature.as_str()))
        .and(matchers::header("x-beacon-attempt", "2"))
        .and(matchers::header("x-beacon-event-id", payload.event_id().to_string().as_str()))
        .and(matchers::body_partial_json(json!({
            "customerName": "Ada Lovelace",
            "customerEmail": "ada@example.com",
            "priority": "high",
            "createdAt": "2024-03-09T14:30:00Z",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "run-81"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = sender(format!("{}/automation", mock_server.uri()), Some("topsecret"))
        .send(&payload, 2)
        .await;

    assert_eq!(outcome, SendOutcome::Sent { provider_id: Some("run-81".to_string()) });
}

#[tokio::test]
async fn ticket_url_points_at_dashboard() {
    let mock_server = MockServer::start().await;
    let payload = ticket_payload();
    let Notification::Ticket(ticket) = payload.notification() else {
        panic!("expected ticket notification");
    };
    let expected_url = format!("https://support.example.com/tickets/{}", ticket.ticket_id);

    Mock::given(matchers::method("POST"))
        .and(matchers::body_partial_json(json!({
            "ticketUrl": expected_url,
            "ticketRef": ticket.ticket_ref,
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = sender(mock_server.uri(), None).send(&payload, 1).await;
    assert_eq!(outcome, SendOutcome::Sent { provider_id: None });
}

#[tokio::test]
async fn unsigned_without_secret() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::header_exists(API_KEY_HEADER))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let outcome = sender(mock_server.uri(), None).send(&ticket_payload(), 1).await;
    assert!(outcome.is_sent(), "got {outcome:?}");
}

#[tokio::test]
async fn accepted_but_not_ok_counts_as_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(202).set_body_string("queued"))
        .mount(&mock_server)
        .await;

    let outcome = sender(mock_server.uri(), Some("k")).send(&ticket_payload(), 1).await;

    assert_eq!(outcome, SendOutcome::Failed {
        error: DeliveryError::unexpected_status(202, "queued"),
    });
}

#[tokio::test]
async fn server_error_is_reported_not_raised() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    match sender(mock_server.uri(), None).send(&ticket_payload(), 1).await {
        SendOutcome::Failed { error: DeliveryError::UnexpectedStatus { status_code, .. } } => {
            assert_eq!(status_code, 503);
        },
        other => panic!("expected failed outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(ClientConfig {
        timeout: Duration::from_millis(50),
        ..Default::default()
    })
    .unwrap();
    let sender = WebhookSender::new(
        Some(WebhookSettings { url: mock_server.uri(), api_key: None }),
        client,
    );

    match sender.send(&ticket_payload(), 1).await {
        SendOutcome::Failed { error } => {
            assert!(matches!(error, DeliveryError::Timeout { .. }), "got {error:?}");
        },
        other => panic!("expected timeout, got {other:?}"),
    }
}
