//! Service wiring: event store backend, processor and query side.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use fraudwatch_core::{AlertOutcome, TransactionEvent, UserId};
use fraudwatch_infra::event_store::{
    EventPage, EventQuery, EventStore, EventStoreError, InMemoryEventStore, Pagination,
    PostgresEventStore,
};
use fraudwatch_infra::{Clock, EventProcessor, ProcessError, SystemClock};
use fraudwatch_rules::RuleEngine;

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("event store unavailable: {0}")]
    Store(#[from] EventStoreError),
}

/// Everything a request handler needs. Shared as `Arc<AppServices>`.
pub struct AppServices {
    processor: EventProcessor<Arc<dyn EventStore>, Arc<dyn Clock>>,
    query: Arc<dyn EventQuery>,
    backend: &'static str,
}

impl AppServices {
    pub fn in_memory(store: InMemoryEventStore, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(store);
        let events: Arc<dyn EventStore> = store.clone();
        Self {
            processor: EventProcessor::new(events, clock, RuleEngine::default()),
            query: store,
            backend: "in_memory",
        }
    }

    pub fn postgres(store: PostgresEventStore, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(store);
        let events: Arc<dyn EventStore> = store.clone();
        Self {
            processor: EventProcessor::new(events, clock, RuleEngine::default()),
            query: store,
            backend: "postgres",
        }
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub async fn process_event(
        &self,
        event: &TransactionEvent,
    ) -> Result<AlertOutcome, ProcessError> {
        self.processor.process(event).await
    }

    pub async fn user_events(
        &self,
        user_id: UserId,
        pagination: Pagination,
    ) -> Result<EventPage, EventStoreError> {
        self.query.events_for_user(user_id, pagination).await
    }

    /// Register users in the account directory (idempotent).
    pub async fn seed_users(&self, user_ids: &[UserId]) -> Result<(), EventStoreError> {
        for user_id in user_ids {
            self.processor.store().register_user(*user_id).await?;
        }
        Ok(())
    }
}

/// Pick the backend from config, prepare it and seed users.
pub async fn build_services(config: &ApiConfig) -> Result<AppServices, StartupError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let services = match &config.database {
        Some(db) => {
            let store = PostgresEventStore::connect(db).await?;
            store.ensure_schema().await?;
            AppServices::postgres(store, clock)
        }
        None => AppServices::in_memory(InMemoryEventStore::new(), clock),
    };

    services.seed_users(&config.seed_user_ids).await?;
    info!(
        backend = services.backend(),
        seeded = config.seed_user_ids.len(),
        "services ready"
    );
    Ok(services)
}
