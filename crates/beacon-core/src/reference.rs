//! Human-readable ticket references.
//!
//! A reference looks like `T-20260117-4821`: the UTC creation date followed
//! by a random four-digit suffix. References are advisory. They are not
//! checked against storage, and two tickets created on the same day may share
//! one; the internal [`crate::TicketId`] remains the primary key.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{error::CoreError, time::Clock};

const PREFIX: &str = "T-";
const SUFFIX_MIN: u16 = 1000;
const SUFFIX_MAX: u16 = 9999;

/// Ticket reference in `T-YYYYMMDD-NNNN` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicketRef {
    date: NaiveDate,
    suffix: u16,
}

impl TicketRef {
    /// Generates a reference for a ticket created at `now`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self::generate_with(now, &mut rand::rng())
    }

    /// Generates a reference for the clock's current time.
    pub fn generate_now(clock: &dyn Clock) -> Self {
        Self::generate(clock.now_utc())
    }

    /// Generates a reference using the supplied random source.
    pub fn generate_with<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> Self {
        Self { date: now.date_naive(), suffix: rng.random_range(SUFFIX_MIN..=SUFFIX_MAX) }
    }

    /// UTC date the ticket was created on.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Random four-digit suffix.
    pub fn suffix(&self) -> u16 {
        self.suffix
    }
}

impl fmt::Display for TicketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}-{:04}", self.date.format("%Y%m%d"), self.suffix)
    }
}

impl FromStr for TicketRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidReference(s.to_string());

        let rest = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        let (date, suffix) = rest.split_once('-').ok_or_else(invalid)?;

        if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if suffix.len() != 4 || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let date = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| invalid())?;
        let suffix = suffix.parse::<u16>().map_err(|_| invalid())?;

        Ok(Self { date, suffix })
    }
}

impl Serialize for TicketRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TicketRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
