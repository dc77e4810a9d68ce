//! Strongly-typed identifiers and instants used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an account holder. Always strictly positive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

/// Unix timestamp in whole seconds.
///
/// Event timestamps are caller-supplied and strictly positive. Window boundaries
/// derived from a timestamp (see [`Timestamp::minus_seconds`]) may fall at or below zero,
/// but only event timestamps are deserialized, so decoding applies the positivity check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Timestamp(i64);

impl UserId {
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if value <= 0 {
            return Err(DomainError::validation("user_id must be greater than 0"));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Timestamp {
    /// Event timestamp; rejects non-positive values.
    pub fn new(seconds: i64) -> Result<Self, DomainError> {
        if seconds <= 0 {
            return Err(DomainError::validation("t must be greater than 0"));
        }
        Ok(Self(seconds))
    }

    /// Raw instant, no positivity check. Used for clock readings and window starts.
    pub fn from_unix(seconds: i64) -> Self {
        Self(seconds)
    }

    pub fn seconds(self) -> i64 {
        self.0
    }

    /// Start of a trailing window of `span` seconds ending at `self`.
    pub fn minus_seconds(self, span: u64) -> Self {
        let span = i64::try_from(span).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(span))
    }
}

impl TryFrom<i64> for UserId {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for i64 {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<i64> for Timestamp {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Timestamp> for i64 {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = i64::from_str(s.trim())
            .map_err(|e| DomainError::validation(format!("user_id: {e}")))?;
        Self::new(raw)
    }
}
