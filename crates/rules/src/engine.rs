use fraudwatch_core::{
    AlertCode, AlertOutcome, DomainError, DomainResult, EventKind, Timestamp, TransactionEvent,
};

use crate::config::{EvaluationWindows, RuleConfig};
use crate::signals::{DepositHistory, HistorySignals, WithdrawHistory};

/// Pure rule evaluator.
///
/// Each rule is an independent check returning at most one code; the outcome is the
/// union of whatever fired. Withdrawal rules only run for withdrawals and deposit rules
/// only for deposits.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    config: RuleConfig,
}

impl RuleEngine {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    /// Window boundaries for a request evaluated at `now`.
    pub fn windows(&self, now: Timestamp) -> EvaluationWindows {
        EvaluationWindows::at(now, &self.config)
    }

    /// Decide the alert codes for `event`.
    ///
    /// Signals of the wrong kind are a caller defect and surface as an invariant
    /// violation rather than being ignored.
    pub fn evaluate(
        &self,
        event: &TransactionEvent,
        signals: &HistorySignals,
    ) -> DomainResult<AlertOutcome> {
        let fired = match (event.kind, signals) {
            (EventKind::Withdraw, HistorySignals::Withdraw(history)) => [
                self.withdrawal_over_limit(event),
                three_consecutive_withdrawals(history),
            ],
            (EventKind::Deposit, HistorySignals::Deposit(history)) => [
                self.deposit_sum_over_limit(event, history),
                increasing_deposits(event, history),
            ],
            (kind, signals) => {
                return Err(DomainError::invariant(format!(
                    "{kind} event evaluated against {} signals",
                    signals.kind()
                )));
            }
        };

        Ok(AlertOutcome::from_codes(fired.into_iter().flatten()))
    }

    fn withdrawal_over_limit(&self, event: &TransactionEvent) -> Option<AlertCode> {
        (event.amount > self.config.withdrawal_limit).then_some(AlertCode::WithdrawalOver100)
    }

    fn deposit_sum_over_limit(
        &self,
        event: &TransactionEvent,
        history: &DepositHistory,
    ) -> Option<AlertCode> {
        let over = match history.recent_deposit_sum.checked_add(event.amount) {
            Some(total) => total > self.config.deposit_window_limit,
            // Out of decimal range is far above any limit.
            None => true,
        };
        over.then_some(AlertCode::DepositSumOver200In30s)
    }
}

fn three_consecutive_withdrawals(history: &WithdrawHistory) -> Option<AlertCode> {
    history
        .prior_two_withdrawals
        .then_some(AlertCode::ThreeConsecutiveWithdrawals)
}

fn increasing_deposits(event: &TransactionEvent, history: &DepositHistory) -> Option<AlertCode> {
    // Most recent first: `latest` is the deposit just before this one.
    let [latest, earlier] = history.last_two_deposits.as_slice() else {
        return None;
    };
    let increasing = earlier.amount < latest.amount && latest.amount < event.amount;
    increasing.then_some(AlertCode::ThreeConsecutiveIncreasingDeposits)
}
