//! Error types for notification delivery.
//!
//! These describe why a single channel attempt failed. They never escape the
//! engine: senders convert them into a failed outcome, the retry policy
//! retries them, and the caller only sees the final delivery report.

use std::{fmt, time::Duration};

use thiserror::Error;

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Why one delivery attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Connection, DNS or TLS failure.
    #[error("network connection failed: {message}")]
    NetworkError {
        /// Error message describing the network failure
        message: String,
    },

    /// HTTP request timeout exceeded.
    #[error("request timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },

    /// The channel answered with a status it does not treat as accepted.
    #[error("unexpected response: HTTP {status_code}")]
    UnexpectedStatus {
        /// HTTP status code
        status_code: u16,
        /// Response body content (truncated)
        body: String,
    },

    /// The channel lacks the credentials or URL it needs.
    #[error("channel {channel} is disabled: {reason}")]
    ChannelDisabled {
        /// Channel name
        channel: String,
        /// Which setting is missing
        reason: String,
    },

    /// Invalid channel configuration or payload for this channel.
    #[error("invalid channel configuration: {message}")]
    ConfigurationError {
        /// Configuration error message
        message: String,
    },
}

impl DeliveryError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Creates a timeout error for the configured request timeout.
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX) }
    }

    /// Creates an unexpected-status error from an HTTP response.
    pub fn unexpected_status(status_code: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedStatus { status_code, body: body.into() }
    }

    /// Creates a disabled-channel error.
    pub fn disabled(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ChannelDisabled { channel: channel.into(), reason: reason.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// Category used as a structured log field.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from(self)
    }
}

/// Coarse classification of delivery errors for logs.
///
/// Retry decisions do not look at the category: every failure is retried
/// the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connectivity and timeouts.
    Network,
    /// HTTP 4xx.
    Client,
    /// HTTP 5xx and other non-accepted statuses.
    Server,
    /// Missing credentials or URL.
    Disabled,
    /// Bad configuration or payload.
    Configuration,
}

impl From<&DeliveryError> for ErrorCategory {
    fn from(error: &DeliveryError) -> Self {
        match error {
            DeliveryError::NetworkError { .. } | DeliveryError::Timeout { .. } => Self::Network,
            DeliveryError::UnexpectedStatus { status_code, .. } if (400..500).contains(status_code) => {
                Self::Client
            },
            DeliveryError::UnexpectedStatus { .. } => Self::Server,
            DeliveryError::ChannelDisabled { .. } => Self::Disabled,
            DeliveryError::ConfigurationError { .. } => Self::Configuration,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
            Self::Disabled => write!(f, "disabled"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
