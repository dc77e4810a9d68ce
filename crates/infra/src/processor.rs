//! Event processing pipeline (application-level orchestration).
//!
//! One incoming transaction runs through a single atomic scope:
//!
//! ```text
//! TransactionEvent
//!   ↓
//! 0. Read the clock once; derive every window boundary from that instant
//!   ↓
//! 1. Open a UnitOfWork
//!   ↓
//! 2. Confirm the user exists (NotFound otherwise)
//!   ↓
//! 3. Fetch history signals for the event's kind only
//!   ↓
//! 4. Evaluate rules (pure)
//!   ↓
//! 5. Append event + outcome
//!   ↓
//! 6. Commit, return outcome
//! ```
//!
//! Any failure in steps 2-5 rolls the scope back, so nothing from the request is
//! persisted. A dropped (cancelled) `process` future drops the scope, which also
//! rolls back.
//!
//! Concurrent events for the same user are not serialized. Two scopes may read the
//! same history before either appends, and both may then commit.

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use fraudwatch_core::{AlertOutcome, DomainError, StoredEvent, TransactionEvent, UserId};
use fraudwatch_rules::{
    DepositHistory, EvaluationWindows, HistorySignals, RuleEngine, WithdrawHistory,
};

use crate::clock::{Clock, SystemClock};
use crate::event_store::{EventStore, EventStoreError, UnitOfWork};

#[derive(Debug, Error)]
pub enum ProcessError {
    /// The event references a user missing from the account directory.
    #[error("user {0} not found")]
    NotFound(UserId),

    /// The alert outcome broke its own invariant, or signals did not match the event.
    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

impl ProcessError {
    /// True for errors the caller caused; everything else is an internal failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ProcessError::NotFound(_))
    }
}

impl From<DomainError> for ProcessError {
    fn from(value: DomainError) -> Self {
        ProcessError::Consistency(value.to_string())
    }
}

/// Runs the read-decide-append cycle for one event at a time.
///
/// Holds no per-user state; it can be shared behind an `Arc` by every request handler.
#[derive(Debug, Clone)]
pub struct EventProcessor<S, C = SystemClock> {
    store: S,
    clock: C,
    engine: RuleEngine,
}

impl<S, C> EventProcessor<S, C>
where
    S: EventStore,
    C: Clock,
{
    pub fn new(store: S, clock: C, engine: RuleEngine) -> Self {
        Self {
            store,
            clock,
            engine,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decide and record the outcome for `event`.
    ///
    /// The event is assumed to be well-formed (positive ids, two-decimal non-negative
    /// amount); the HTTP boundary validates that before calling in.
    #[instrument(
        skip(self, event),
        fields(user_id = %event.user_id, kind = %event.kind, t = %event.occurred_at)
    )]
    pub async fn process(&self, event: &TransactionEvent) -> Result<AlertOutcome, ProcessError> {
        let windows = self.engine.windows(self.clock.now());

        let mut scope = self.store.begin().await.map_err(|err| {
            error!(error = %err, "failed to open event scope");
            ProcessError::from(err)
        })?;

        let stored = match self.decide_and_append(&mut scope, event, &windows).await {
            Ok(stored) => stored,
            Err(err) => {
                if let Err(rollback_err) = scope.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                log_failure(&err);
                return Err(err);
            }
        };

        if let Err(err) = scope.commit().await {
            error!(error = %err, "failed to commit event");
            return Err(err.into());
        }

        info!(
            event_id = %stored.event_id,
            alerted = stored.outcome.alerted(),
            alert_codes = ?stored.outcome.code_values(),
            "event processed"
        );
        Ok(stored.outcome)
    }

    async fn decide_and_append(
        &self,
        scope: &mut Box<dyn UnitOfWork>,
        event: &TransactionEvent,
        windows: &EvaluationWindows,
    ) -> Result<StoredEvent, ProcessError> {
        if !scope.user_exists(event.user_id).await? {
            return Err(ProcessError::NotFound(event.user_id));
        }

        let signals = read_signals(scope, event, windows).await?;
        let outcome = self.engine.evaluate(event, &signals)?;
        outcome.ensure_consistent()?;

        Ok(scope.append(event, &outcome).await?)
    }
}

/// Fetch only the history the event's kind needs, all against the same windows.
async fn read_signals(
    scope: &mut Box<dyn UnitOfWork>,
    event: &TransactionEvent,
    windows: &EvaluationWindows,
) -> Result<HistorySignals, EventStoreError> {
    let user_id = event.user_id;
    if event.is_withdraw() {
        let prior_two_withdrawals = scope
            .recent_withdraw_streak(user_id, windows.history_since)
            .await?;
        Ok(HistorySignals::Withdraw(WithdrawHistory {
            prior_two_withdrawals,
        }))
    } else {
        let recent_deposit_sum = scope.deposit_sum(user_id, windows.deposit_sum_since).await?;
        let last_two_deposits = scope
            .last_two_deposits(user_id, windows.history_since)
            .await?;
        Ok(HistorySignals::Deposit(DepositHistory {
            recent_deposit_sum,
            last_two_deposits,
        }))
    }
}

fn log_failure(err: &ProcessError) {
    match err {
        ProcessError::NotFound(user_id) => debug!(%user_id, "event for unknown user"),
        ProcessError::Consistency(msg) => error!(reason = %msg, "alert outcome rejected"),
        ProcessError::Store(cause) => error!(error = %cause, "event store failure"),
    }
}
