//! `fraudwatch-core`: domain building blocks for transaction monitoring.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod alert;
pub mod error;
pub mod event;
pub mod id;
pub mod money;
pub mod value_object;

pub use alert::{AlertCode, AlertOutcome};
pub use error::{DomainError, DomainResult};
pub use event::{EventKind, StoredEvent, TransactionEvent};
pub use id::{Timestamp, UserId};
pub use money::{Amount, AmountError};
pub use value_object::ValueObject;
