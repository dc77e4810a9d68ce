use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use fraudwatch_core::{AlertOutcome, Amount, StoredEvent, Timestamp, TransactionEvent, UserId};
use fraudwatch_rules::PriorDeposit;

/// Event store operation error.
///
/// These are **infrastructure errors** (storage, transactions, unreadable rows) as opposed
/// to domain errors. Callers surface all of them as one generic internal failure.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A read or write failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Opening, committing or rolling back the atomic scope failed.
    #[error("transaction failure: {0}")]
    Transaction(String),

    /// A persisted row could not be mapped back to domain types.
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Append-only, user-scoped event log.
///
/// All reads and the single append for one request go through a [`UnitOfWork`] obtained
/// from [`EventStore::begin`], so they commit together or not at all.
///
/// ## Isolation
///
/// A scope gives crash-atomicity per event, not cross-event isolation. Two scopes for the
/// same user may both read the same history before either appends; implementations must
/// not add per-user serialization behind the caller's back.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Open an atomic scope. Dropping the scope without committing rolls it back.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, EventStoreError>;

    /// Add a user to the account directory (idempotent). Used for seeding.
    async fn register_user(&self, user_id: UserId) -> Result<(), EventStoreError>;
}

/// One atomic read-decide-append scope.
///
/// The connection or buffer behind a scope is owned exclusively by it until
/// [`UnitOfWork::commit`], [`UnitOfWork::rollback`] or drop.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Existence check against the account directory.
    async fn user_exists(&mut self, user_id: UserId) -> Result<bool, EventStoreError>;

    /// True iff the two most recent events at or after `since` are both withdrawals.
    /// False with fewer than two such events.
    async fn recent_withdraw_streak(
        &mut self,
        user_id: UserId,
        since: Timestamp,
    ) -> Result<bool, EventStoreError>;

    /// Sum of deposit amounts at or after `since`; zero when there are none.
    async fn deposit_sum(
        &mut self,
        user_id: UserId,
        since: Timestamp,
    ) -> Result<Amount, EventStoreError>;

    /// Up to two deposits at or after `since`, most recent first.
    async fn last_two_deposits(
        &mut self,
        user_id: UserId,
        since: Timestamp,
    ) -> Result<Vec<PriorDeposit>, EventStoreError>;

    /// Write one stored event. Visible to others only after commit.
    async fn append(
        &mut self,
        event: &TransactionEvent,
        outcome: &AlertOutcome,
    ) -> Result<StoredEvent, EventStoreError>;

    async fn commit(self: Box<Self>) -> Result<(), EventStoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), EventStoreError>;
}

#[async_trait]
impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, EventStoreError> {
        (**self).begin().await
    }

    async fn register_user(&self, user_id: UserId) -> Result<(), EventStoreError> {
        (**self).register_user(user_id).await
    }
}
