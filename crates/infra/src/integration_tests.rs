//! Integration tests for the processing pipeline.
//!
//! Tests: EventProcessor → UnitOfWork → InMemoryEventStore
//!
//! Verifies:
//! - A failure anywhere in the scope leaves no stored event behind
//! - A cancelled request rolls back
//! - Concurrent events for one user are not serialized (both read the same history)

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Barrier;

    use fraudwatch_core::{
        AlertCode, AlertOutcome, Amount, EventKind, StoredEvent, Timestamp, TransactionEvent,
        UserId,
    };
    use fraudwatch_rules::{PriorDeposit, RuleEngine};

    use crate::clock::FixedClock;
    use crate::event_store::{EventStore, EventStoreError, InMemoryEventStore, UnitOfWork};
    use crate::processor::{EventProcessor, ProcessError};

    const NOW: i64 = 1_700_000_000;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Fault {
        None,
        FailAppend,
        FailCommit,
    }

    /// Wraps the in-memory store to inject failures and pause scopes before appending.
    struct FaultyStore {
        inner: InMemoryEventStore,
        fault: Fault,
        gate: Option<Arc<Barrier>>,
    }

    struct FaultyScope {
        inner: Box<dyn UnitOfWork>,
        fault: Fault,
        gate: Option<Arc<Barrier>>,
    }

    #[async_trait]
    impl EventStore for FaultyStore {
        async fn begin(&self) -> Result<Box<dyn UnitOfWork>, EventStoreError> {
            Ok(Box::new(FaultyScope {
                inner: self.inner.begin().await?,
                fault: self.fault,
                gate: self.gate.clone(),
            }))
        }

        async fn register_user(&self, user_id: UserId) -> Result<(), EventStoreError> {
            self.inner.register_user(user_id).await
        }
    }

    #[async_trait]
    impl UnitOfWork for FaultyScope {
        async fn user_exists(&mut self, user_id: UserId) -> Result<bool, EventStoreError> {
            self.inner.user_exists(user_id).await
        }

        async fn recent_withdraw_streak(
            &mut self,
            user_id: UserId,
            since: Timestamp,
        ) -> Result<bool, EventStoreError> {
            self.inner.recent_withdraw_streak(user_id, since).await
        }

        async fn deposit_sum(
            &mut self,
            user_id: UserId,
            since: Timestamp,
        ) -> Result<Amount, EventStoreError> {
            self.inner.deposit_sum(user_id, since).await
        }

        async fn last_two_deposits(
            &mut self,
            user_id: UserId,
            since: Timestamp,
        ) -> Result<Vec<PriorDeposit>, EventStoreError> {
            self.inner.last_two_deposits(user_id, since).await
        }

        async fn append(
            &mut self,
            event: &TransactionEvent,
            outcome: &AlertOutcome,
        ) -> Result<StoredEvent, EventStoreError> {
            if let Some(gate) = &self.gate {
                gate.wait().await;
            }
            if self.fault == Fault::FailAppend {
                return Err(EventStoreError::Storage("disk full".into()));
            }
            self.inner.append(event, outcome).await
        }

        async fn commit(self: Box<Self>) -> Result<(), EventStoreError> {
            if self.fault == Fault::FailCommit {
                return Err(EventStoreError::Transaction("connection reset".into()));
            }
            self.inner.commit().await
        }

        async fn rollback(self: Box<Self>) -> Result<(), EventStoreError> {
            self.inner.rollback().await
        }
    }

    fn user() -> UserId {
        UserId::new(1).unwrap()
    }

    fn deposit(t: i64, amount: &str) -> TransactionEvent {
        TransactionEvent::new(
            user(),
            Timestamp::new(t).unwrap(),
            Amount::parse(amount).unwrap(),
            EventKind::Deposit,
        )
    }

    fn setup(
        fault: Fault,
        gate: Option<Arc<Barrier>>,
    ) -> (EventProcessor<FaultyStore, FixedClock>, InMemoryEventStore) {
        let inner = InMemoryEventStore::with_users([user()]);
        let store = FaultyStore {
            inner: inner.clone(),
            fault,
            gate,
        };
        let clock = FixedClock::new(Timestamp::from_unix(NOW));
        (EventProcessor::new(store, clock, RuleEngine::default()), inner)
    }

    #[tokio::test]
    async fn append_failure_is_internal_and_persists_nothing() {
        let (processor, inner) = setup(Fault::FailAppend, None);

        let err = processor.process(&deposit(NOW, "10.00")).await.unwrap_err();

        assert!(matches!(err, ProcessError::Store(EventStoreError::Storage(_))));
        assert!(!err.is_client_error());
        assert_eq!(inner.event_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn commit_failure_discards_the_append() {
        let (processor, inner) = setup(Fault::FailCommit, None);

        let err = processor.process(&deposit(NOW, "10.00")).await.unwrap_err();

        assert!(matches!(err, ProcessError::Store(EventStoreError::Transaction(_))));
        assert_eq!(inner.event_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn cancelled_request_rolls_back() {
        // Two-party barrier with one participant: append never proceeds.
        let gate = Arc::new(Barrier::new(2));
        let (processor, inner) = setup(Fault::None, Some(gate));

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            processor.process(&deposit(NOW, "10.00")),
        )
        .await;

        assert!(result.is_err(), "process should still be parked at the gate");
        assert_eq!(inner.event_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_deposits_for_one_user_both_miss_each_other() {
        let gate = Arc::new(Barrier::new(2));
        let (processor, inner) = setup(Fault::None, Some(gate));

        // Sequentially the second deposit would push the 30s total to 300.00.
        let first = deposit(NOW - 1, "150.00");
        let second = deposit(NOW, "150.00");
        let (a, b) = tokio::join!(processor.process(&first), processor.process(&second));

        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(!a.contains(AlertCode::DepositSumOver200In30s));
        assert!(!b.contains(AlertCode::DepositSumOver200In30s));
        assert_eq!(inner.event_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn sequential_deposits_see_each_other() {
        let (processor, _) = setup(Fault::None, None);

        processor.process(&deposit(NOW - 1, "150.00")).await.unwrap();
        let outcome = processor.process(&deposit(NOW, "150.00")).await.unwrap();

        assert_eq!(outcome.code_values(), vec![123]);
    }
}
