//! Error types for ticket identity and input validation.
//!
//! Validation failures are reported as a complete, ordered list of
//! field-level messages rather than the first problem found, so callers can
//! hand the whole list back to a client in one response.

use serde::Serialize;
use thiserror::Error;

/// Core error type for parsing and conversion of domain values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A ticket reference did not match `T-YYYYMMDD-NNNN`.
    #[error("invalid ticket reference: {0}")]
    InvalidReference(String),

    /// An enumerated value was outside its allowed set.
    #[error("invalid {field}: {value}")]
    InvalidValue {
        /// Name of the field being parsed
        field: &'static str,
        /// The rejected value
        value: String,
    },
}

/// Non-empty ordered list of field-level validation messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
#[error("validation failed: {}", .0.join("; "))]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    /// Builds the error list, returning `None` when there is nothing to report.
    pub fn from_messages(messages: Vec<String>) -> Option<Self> {
        if messages.is_empty() {
            None
        } else {
            Some(Self(messages))
        }
    }

    /// Builds an error list holding one message.
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    /// Returns the messages in the order the fields were checked.
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// Number of invalid fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; an empty list is never constructed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
