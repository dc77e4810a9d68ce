//! History facts fetched from the event store for one evaluation.

use serde::{Deserialize, Serialize};

use fraudwatch_core::{Amount, EventKind, Timestamp};

/// A deposit from the trailing history window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorDeposit {
    pub amount: Amount,
    pub occurred_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawHistory {
    /// The two most recent events in the history window are both withdrawals.
    pub prior_two_withdrawals: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositHistory {
    /// Sum of deposits in the deposit-sum window; zero when there are none.
    pub recent_deposit_sum: Amount,
    /// Up to two deposits from the history window, most recent first.
    pub last_two_deposits: Vec<PriorDeposit>,
}

/// Signals for exactly one transaction kind. A withdrawal never sees deposit data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistorySignals {
    Withdraw(WithdrawHistory),
    Deposit(DepositHistory),
}

impl HistorySignals {
    pub fn kind(&self) -> EventKind {
        match self {
            HistorySignals::Withdraw(_) => EventKind::Withdraw,
            HistorySignals::Deposit(_) => EventKind::Deposit,
        }
    }
}
