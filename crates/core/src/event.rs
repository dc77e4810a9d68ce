//! Transaction events and their stored form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alert::AlertOutcome;
use crate::error::DomainError;
use crate::id::{Timestamp, UserId};
use crate::money::Amount;
use crate::value_object::ValueObject;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Deposit,
    Withdraw,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Deposit => "deposit",
            EventKind::Withdraw => "withdraw",
        }
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for EventKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(EventKind::Deposit),
            "withdraw" => Ok(EventKind::Withdraw),
            _ => Err(DomainError::validation("type must be one of: deposit, withdraw")),
        }
    }
}

/// One submitted transaction, already validated at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub user_id: UserId,
    /// Caller-supplied; assumed increasing and unique per user.
    pub occurred_at: Timestamp,
    pub amount: Amount,
    pub kind: EventKind,
}

impl ValueObject for TransactionEvent {}

impl TransactionEvent {
    pub fn new(user_id: UserId, occurred_at: Timestamp, amount: Amount, kind: EventKind) -> Self {
        Self {
            user_id,
            occurred_at,
            amount,
            kind,
        }
    }

    pub fn is_deposit(&self) -> bool {
        self.kind == EventKind::Deposit
    }

    pub fn is_withdraw(&self) -> bool {
        self.kind == EventKind::Withdraw
    }
}

/// An event together with the outcome decided for it. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub event: TransactionEvent,
    pub outcome: AlertOutcome,
    /// Server time the row was written.
    pub recorded_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Assign a fresh time-ordered id.
    pub fn record(event: TransactionEvent, outcome: AlertOutcome, recorded_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event,
            outcome,
            recorded_at,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.event.user_id
    }

    pub fn occurred_at(&self) -> Timestamp {
        self.event.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_only_known_values() {
        assert_eq!("deposit".parse::<EventKind>().unwrap(), EventKind::Deposit);
        assert_eq!("withdraw".parse::<EventKind>().unwrap(), EventKind::Withdraw);
        let err = "INVALID TYPE".parse::<EventKind>().unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation("type must be one of: deposit, withdraw".to_string())
        );
        assert!("Deposit".parse::<EventKind>().is_err());
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EventKind::Withdraw).unwrap(), "\"withdraw\"");
    }

    #[test]
    fn decoded_events_keep_timestamps_positive() {
        let ok = r#"{"user_id":1,"occurred_at":5,"amount":"1.00","kind":"deposit"}"#;
        let decoded: TransactionEvent = serde_json::from_str(ok).unwrap();
        assert_eq!(decoded.occurred_at.seconds(), 5);

        let zero = r#"{"user_id":1,"occurred_at":0,"amount":"1.00","kind":"deposit"}"#;
        assert!(serde_json::from_str::<TransactionEvent>(zero).is_err());
    }
}
