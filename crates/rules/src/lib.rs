//! Fraud rule evaluation.
//!
//! Pure decision logic: given a new event and the history signals fetched for it,
//! compute the alert codes that apply. No IO, no clock, no shared state.

pub mod config;
pub mod engine;
pub mod signals;

pub use config::{EvaluationWindows, RuleConfig};
pub use engine::RuleEngine;
pub use signals::{DepositHistory, HistorySignals, PriorDeposit, WithdrawHistory};
