//! HTTP client shared by all channel senders.
//!
//! Handles request construction, the per-request timeout and transport
//! error categorization. Deciding which status codes count as accepted is
//! left to each sender.

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DeliveryError, Result};

/// Response bodies above this size are cut down before being kept.
const MAX_RESPONSE_BODY_SIZE: usize = 64 * 1024;

/// Size kept from an oversized body, including the truncation marker.
const MAX_KEPT_BODY_SIZE: usize = 1024;

/// Configuration for the outbound HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Timeout for a single request, connect through body.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            user_agent: concat!("beacon/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Body of an outbound request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Raw bytes with an explicit content type.
    Raw {
        /// Serialized payload
        body: Bytes,
        /// Value for the `content-type` header
        content_type: String,
    },
    /// `application/x-www-form-urlencoded` fields.
    Form(Vec<(String, String)>),
}

/// One outbound POST.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Destination URL.
    pub url: String,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Basic auth credentials (username, password).
    pub basic_auth: Option<(String, String)>,
    /// Request body.
    pub body: RequestBody,
}

/// Response to an outbound POST.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body (limited size).
    pub body: String,
    /// Total duration of the request.
    pub duration: Duration,
}

impl HttpResponse {
    /// Parses the body as JSON and returns the string field `key`, if any.
    pub fn json_field(&self, key: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        value.get(key)?.as_str().map(str::to_string)
    }
}

/// HTTP client with connection pooling and a fixed request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpClient {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConfigurationError` if the underlying client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| DeliveryError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Sends a POST and returns the response whatever its status.
    ///
    /// # Errors
    ///
    /// - `Timeout` when the request exceeds the configured timeout
    /// - `NetworkError` for connection, DNS and other transport failures
    pub async fn post(&self, request: HttpRequest) -> Result<HttpResponse> {
        let start_time = Instant::now();

        let mut builder = self.client.post(&request.url);
        builder = match request.body {
            RequestBody::Raw { body, content_type } => {
                builder.header(reqwest::header::CONTENT_TYPE, content_type).body(body)
            },
            RequestBody::Form(fields) => builder.form(&fields),
        };
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let duration = start_time.elapsed();
                warn!(duration_ms = duration.as_millis(), "request failed: {}", e);

                if e.is_timeout() {
                    return Err(DeliveryError::timeout(self.config.timeout));
                }
                if e.is_connect() {
                    return Err(DeliveryError::network(format!("connection failed: {e}")));
                }
                return Err(DeliveryError::network(e.to_string()));
            },
        };

        let response = read_response(response, start_time, self.config.timeout).await?;
        debug!(
            status = response.status_code,
            duration_ms = response.duration.as_millis(),
            "received response"
        );
        Ok(response)
    }
}

async fn read_response(
    response: Response,
    start_time: Instant,
    timeout: Duration,
) -> Result<HttpResponse> {
    let status_code = response.status().as_u16();

    let body = match response.bytes().await {
        Ok(bytes) => truncate_body(&bytes),
        Err(e) if e.is_timeout() => {
            warn!("timed out reading response body: {}", e);
            return Err(DeliveryError::timeout(timeout));
        },
        Err(e) => {
            warn!("failed to read response body: {}", e);
            format!("[failed to read response body: {e}]")
        },
    };

    Ok(HttpResponse { status_code, body, duration: start_time.elapsed() })
}

fn truncate_body(bytes: &[u8]) -> String {
    if bytes.len() > MAX_RESPONSE_BODY_SIZE {
        let suffix = "... (truncated)";
        let max_content = MAX_KEPT_BODY_SIZE - suffix.len();
        let truncated = String::from_utf8_lossy(&bytes[..max_content]);
        format!("{truncated}{suffix}")
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}
