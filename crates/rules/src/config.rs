use serde::{Deserialize, Serialize};

use fraudwatch_core::{Amount, Timestamp};

const SECONDS_PER_WEEK: u64 = 60 * 60 * 24 * 7;

/// Thresholds and window lengths used by the rules.
///
/// All thresholds are exclusive: an amount equal to a limit does not alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Single withdrawals strictly above this alert.
    pub withdrawal_limit: Amount,
    /// Deposit totals strictly above this within `deposit_sum_window_secs` alert.
    pub deposit_window_limit: Amount,
    pub deposit_sum_window_secs: u64,
    /// Look-back for the "consecutive" rules. Keeps a years-old pattern from counting.
    pub history_window_secs: u64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            withdrawal_limit: Amount::from_cents(100_00),
            deposit_window_limit: Amount::from_cents(200_00),
            deposit_sum_window_secs: 30,
            history_window_secs: SECONDS_PER_WEEK,
        }
    }
}

/// Window starts for one request, all derived from a single `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationWindows {
    pub now: Timestamp,
    /// Lower bound for the withdrawal streak and the increasing-deposit rule.
    pub history_since: Timestamp,
    /// Lower bound for the deposit sum rule.
    pub deposit_sum_since: Timestamp,
}

impl EvaluationWindows {
    pub fn at(now: Timestamp, config: &RuleConfig) -> Self {
        Self {
            now,
            history_since: now.minus_seconds(config.history_window_secs),
            deposit_sum_since: now.minus_seconds(config.deposit_sum_window_secs),
        }
    }
}
