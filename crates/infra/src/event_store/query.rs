//! Read-only inspection of the event log.
//!
//! Not used on the decision path; the rules only ever read through a `UnitOfWork`.

use serde::{Deserialize, Serialize};

use fraudwatch_core::{StoredEvent, UserId};

use crate::event_store::EventStoreError;

/// Pagination parameters for event queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of events to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

/// One page of a user's log, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<StoredEvent>,
    /// Total number of events for the user (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl EventPage {
    pub(crate) fn new(events: Vec<StoredEvent>, total: u64, pagination: Pagination) -> Self {
        let has_more = total > u64::from(pagination.offset) + u64::from(pagination.limit);
        Self {
            events,
            total,
            pagination,
            has_more,
        }
    }
}

#[async_trait::async_trait]
pub trait EventQuery: Send + Sync {
    /// Committed events for `user_id`, ordered by `occurred_at` descending.
    async fn events_for_user(
        &self,
        user_id: UserId,
        pagination: Pagination,
    ) -> Result<EventPage, EventStoreError>;
}

#[async_trait::async_trait]
impl<Q> EventQuery for std::sync::Arc<Q>
where
    Q: EventQuery + ?Sized,
{
    async fn events_for_user(
        &self,
        user_id: UserId,
        pagination: Pagination,
    ) -> Result<EventPage, EventStoreError> {
        (**self).events_for_user(user_id, pagination).await
    }
}
