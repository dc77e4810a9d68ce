use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use fraudwatch_core::{
    AlertOutcome, Amount, EventKind, StoredEvent, Timestamp, TransactionEvent, UserId,
};
use fraudwatch_rules::PriorDeposit;

use super::query::{EventPage, EventQuery, Pagination};
use super::r#trait::{EventStore, EventStoreError, UnitOfWork};

#[derive(Debug, Default)]
struct State {
    users: HashSet<UserId>,
    /// Committed events per user, in commit order.
    streams: HashMap<UserId, Vec<StoredEvent>>,
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. Scopes buffer their append and publish it on commit, so an
/// uncommitted scope leaves no trace. Scopes do not lock each other out: overlapping
/// scopes for the same user read the same committed history.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserId>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.write() {
            state.users.extend(users);
        }
        store
    }

    /// Committed events for `user_id` in commit order.
    pub fn committed(&self, user_id: UserId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.streams.get(&user_id).cloned().unwrap_or_default())
    }

    /// Number of committed events across all users.
    pub fn event_count(&self) -> Result<usize, EventStoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.streams.values().map(Vec::len).sum())
    }
}

fn poisoned() -> EventStoreError {
    EventStoreError::Storage("lock poisoned".to_string())
}

/// Most recent first. Equal timestamps keep whatever relative order they had.
fn sort_recent_first(events: &mut [StoredEvent]) {
    events.sort_by(|a, b| b.occurred_at().cmp(&a.occurred_at()));
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, EventStoreError> {
        Ok(Box::new(InMemoryUnitOfWork {
            state: Arc::clone(&self.state),
            pending: Vec::new(),
        }))
    }

    async fn register_user(&self, user_id: UserId) -> Result<(), EventStoreError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.users.insert(user_id);
        Ok(())
    }
}

#[async_trait]
impl EventQuery for InMemoryEventStore {
    async fn events_for_user(
        &self,
        user_id: UserId,
        pagination: Pagination,
    ) -> Result<EventPage, EventStoreError> {
        let mut events = self.committed(user_id)?;
        sort_recent_first(&mut events);

        let total = events.len() as u64;
        let page = events
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        Ok(EventPage::new(page, total, pagination))
    }
}

/// Scope over the shared state. Reads see committed rows plus this scope's own pending row.
#[derive(Debug)]
pub struct InMemoryUnitOfWork {
    state: Arc<RwLock<State>>,
    pending: Vec<StoredEvent>,
}

impl InMemoryUnitOfWork {
    /// Events for `user_id` with `occurred_at >= since`, most recent first.
    fn window(&self, user_id: UserId, since: Timestamp) -> Result<Vec<StoredEvent>, EventStoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let committed = state.streams.get(&user_id).map(Vec::as_slice).unwrap_or_default();

        let mut events: Vec<StoredEvent> = committed
            .iter()
            .chain(self.pending.iter().filter(|e| e.user_id() == user_id))
            .filter(|e| e.occurred_at() >= since)
            .cloned()
            .collect();
        sort_recent_first(&mut events);
        Ok(events)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn user_exists(&mut self, user_id: UserId) -> Result<bool, EventStoreError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.users.contains(&user_id))
    }

    async fn recent_withdraw_streak(
        &mut self,
        user_id: UserId,
        since: Timestamp,
    ) -> Result<bool, EventStoreError> {
        let recent = self.window(user_id, since)?;
        let withdrawals = recent
            .iter()
            .take(2)
            .filter(|e| e.event.kind == EventKind::Withdraw)
            .count();
        Ok(withdrawals == 2)
    }

    async fn deposit_sum(
        &mut self,
        user_id: UserId,
        since: Timestamp,
    ) -> Result<Amount, EventStoreError> {
        self.window(user_id, since)?
            .iter()
            .filter(|e| e.event.is_deposit())
            .try_fold(Amount::ZERO, |acc, e| acc.checked_add(e.event.amount))
            .ok_or_else(|| EventStoreError::Storage("deposit sum out of range".to_string()))
    }

    async fn last_two_deposits(
        &mut self,
        user_id: UserId,
        since: Timestamp,
    ) -> Result<Vec<PriorDeposit>, EventStoreError> {
        Ok(self
            .window(user_id, since)?
            .iter()
            .filter(|e| e.event.is_deposit())
            .take(2)
            .map(|e| PriorDeposit {
                amount: e.event.amount,
                occurred_at: e.occurred_at(),
            })
            .collect())
    }

    async fn append(
        &mut self,
        event: &TransactionEvent,
        outcome: &AlertOutcome,
    ) -> Result<StoredEvent, EventStoreError> {
        // Mirrors the users foreign key of the SQL schema.
        if !self.user_exists(event.user_id).await? {
            return Err(EventStoreError::Storage(format!(
                "user {} is not in the account directory",
                event.user_id
            )));
        }

        let stored = StoredEvent::record(event.clone(), outcome.clone(), Utc::now());
        self.pending.push(stored.clone());
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> Result<(), EventStoreError> {
        let InMemoryUnitOfWork { state, pending } = *self;
        let mut state = state.write().map_err(|_| poisoned())?;
        for stored in pending {
            state.streams.entry(stored.user_id()).or_default().push(stored);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), EventStoreError> {
        Ok(())
    }
}
