//! Outbound notification delivery with retries and channel fallback.
//!
//! This crate takes an [`beacon_core::EventPayload`] and gets it to a human
//! through the first channel that accepts it. Every channel is retried with
//! exponential backoff before the next one in the fallback order is tried.
//!
//! # Architecture
//!
//! 1. **Configure** - [`Config`] is layered from defaults, `beacon.toml` and
//!    `BEACON_*` environment variables
//! 2. **Assemble** - [`Notifier::from_config`] keeps the enabled channels,
//!    webhook first and messaging second
//! 3. **Deliver** - [`Notifier::deliver`] runs each channel under the
//!    [`RetryPolicy`] until one accepts the payload
//! 4. **Report** - every attempt is recorded in the [`DeliveryReport`] and
//!    streamed to the configured observer
//!
//! # Example
//!
//! ```no_run
//! use beacon_core::{AlertNotification, AlertStatus, EventPayload, Notification, Severity};
//! use beacon_delivery::{Config, Notifier};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let notifier = Notifier::from_config(&config)?;
//!
//! let alert = AlertNotification {
//!     alert_id: "a-42".to_string(),
//!     alert_type: "disk_usage".to_string(),
//!     severity: Severity::Critical,
//!     status: AlertStatus::Triggered,
//!     entity: "db-primary".to_string(),
//!     message: "disk 97% full".to_string(),
//!     triggered_at: chrono::Utc::now(),
//! };
//! let payload = EventPayload::new(Notification::Alert(alert), chrono::Utc::now());
//!
//! // Runs in the background; the caller can carry on.
//! let report = notifier.dispatch(payload).await?;
//! println!("delivered: {}", report.is_delivered());
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod messaging;
pub mod retry;
pub mod webhook;

pub use channel::{ChannelDescriptor, ChannelSender, SendOutcome};
pub use config::Config;
pub use engine::{DeliveryOutcome, DeliveryReport, Notifier};
pub use error::{DeliveryError, ErrorCategory, Result};
pub use retry::RetryPolicy;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
