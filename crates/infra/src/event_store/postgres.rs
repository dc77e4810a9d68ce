//! Postgres-backed event store implementation.
//!
//! Each [`UnitOfWork`] owns one pooled connection inside a database transaction
//! (`pool.begin()`). Commit publishes the append; rollback, or dropping the scope
//! (error paths, cancelled request futures), discards it and returns the connection
//! to the pool.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | EventStoreError | Scenario |
//! |------------|----------------------|-----------------|----------|
//! | Database (foreign key violation) | `23503` | `Storage` | Append for a user missing from `users` |
//! | Database (check constraint violation) | `23514` | `Storage` | Row violates a schema check |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | PoolTimedOut / PoolClosed | N/A | `Transaction` | No connection available for a scope |
//! | ColumnDecode / ColumnNotFound | N/A | `CorruptRow` | Row does not map to domain types |
//! | Other | N/A | `Storage` | Network errors, protocol errors, etc. |

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use fraudwatch_core::{
    AlertCode, AlertOutcome, Amount, EventKind, StoredEvent, Timestamp, TransactionEvent, UserId,
};
use fraudwatch_rules::PriorDeposit;

use super::query::{EventPage, EventQuery, Pagination};
use super::r#trait::{EventStore, EventStoreError, UnitOfWork};
use crate::config::DatabaseConfig;

const SCHEMA: &str = include_str!("../../schema.sql");

/// Postgres-backed append-only event store.
///
/// `PostgresEventStore` is `Send + Sync` and cheap to clone; all access goes through
/// the SQLx connection pool.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: Arc<PgPool>,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool from explicit configuration.
    #[instrument(skip(config), err)]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, EventStoreError> {
        let options = config
            .connect_options()
            .map_err(|e| EventStoreError::Transaction(format!("invalid database config: {e}")))?;
        let pool = config
            .pool_options()
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `users` / `events` tables and index if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), EventStoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, EventStoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn register_user(&self, user_id: UserId) -> Result<(), EventStoreError> {
        sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(user_id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("register_user", e))?;
        Ok(())
    }
}

#[async_trait]
impl EventQuery for PostgresEventStore {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn events_for_user(
        &self,
        user_id: UserId,
        pagination: Pagination,
    ) -> Result<EventPage, EventStoreError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM events WHERE user_id = $1")
            .bind(user_id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_events", e))?
            .try_get("total")
            .map_err(|e| map_sqlx_error("count_events", e))?;

        let rows = sqlx::query(
            r#"
            SELECT
                event_id,
                user_id,
                occurred_at,
                amount,
                kind,
                alerted,
                alert_codes,
                recorded_at
            FROM events
            WHERE user_id = $1
            ORDER BY occurred_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.get())
        .bind(i64::from(pagination.limit))
        .bind(i64::from(pagination.offset))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("events_for_user", e))?;

        let events = rows
            .iter()
            .map(|row| StoredEventRow::from_row(row).and_then(StoredEvent::try_from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EventPage::new(events, total.max(0) as u64, pagination))
    }
}

/// One request's transaction. Dropped without commit, sqlx rolls it back.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn user_exists(&mut self, user_id: UserId) -> Result<bool, EventStoreError> {
        sqlx::query("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1) AS found")
            .bind(user_id.get())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("user_exists", e))?
            .try_get("found")
            .map_err(|e| map_sqlx_error("user_exists", e))
    }

    #[instrument(skip(self), fields(user_id = %user_id, since = %since), err)]
    async fn recent_withdraw_streak(
        &mut self,
        user_id: UserId,
        since: Timestamp,
    ) -> Result<bool, EventStoreError> {
        sqlx::query(
            r#"
            SELECT COUNT(*) FILTER (WHERE recent.kind = 'withdraw') = 2 AS streak
            FROM (
                SELECT kind
                FROM events
                WHERE user_id = $1 AND occurred_at >= $2
                ORDER BY occurred_at DESC
                LIMIT 2
            ) AS recent
            "#,
        )
        .bind(user_id.get())
        .bind(since.seconds())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("recent_withdraw_streak", e))?
        .try_get("streak")
        .map_err(|e| map_sqlx_error("recent_withdraw_streak", e))
    }

    #[instrument(skip(self), fields(user_id = %user_id, since = %since), err)]
    async fn deposit_sum(
        &mut self,
        user_id: UserId,
        since: Timestamp,
    ) -> Result<Amount, EventStoreError> {
        let total: Decimal = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount), 0) AS total
            FROM events
            WHERE user_id = $1 AND kind = 'deposit' AND occurred_at >= $2
            "#,
        )
        .bind(user_id.get())
        .bind(since.seconds())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("deposit_sum", e))?
        .try_get("total")
        .map_err(|e| map_sqlx_error("deposit_sum", e))?;

        Amount::new(total).map_err(|e| EventStoreError::CorruptRow(format!("deposit sum {total}: {e}")))
    }

    #[instrument(skip(self), fields(user_id = %user_id, since = %since), err)]
    async fn last_two_deposits(
        &mut self,
        user_id: UserId,
        since: Timestamp,
    ) -> Result<Vec<PriorDeposit>, EventStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT amount, occurred_at
            FROM events
            WHERE user_id = $1 AND kind = 'deposit' AND occurred_at >= $2
            ORDER BY occurred_at DESC
            LIMIT 2
            "#,
        )
        .bind(user_id.get())
        .bind(since.seconds())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("last_two_deposits", e))?;

        rows.iter()
            .map(|row| {
                let amount: Decimal = row
                    .try_get("amount")
                    .map_err(|e| map_sqlx_error("last_two_deposits", e))?;
                let occurred_at: i64 = row
                    .try_get("occurred_at")
                    .map_err(|e| map_sqlx_error("last_two_deposits", e))?;
                Ok(PriorDeposit {
                    amount: Amount::new(amount)
                        .map_err(|e| EventStoreError::CorruptRow(format!("amount {amount}: {e}")))?,
                    occurred_at: Timestamp::from_unix(occurred_at),
                })
            })
            .collect()
    }

    #[instrument(
        skip(self, event, outcome),
        fields(user_id = %event.user_id, occurred_at = %event.occurred_at, kind = %event.kind),
        err
    )]
    async fn append(
        &mut self,
        event: &TransactionEvent,
        outcome: &AlertOutcome,
    ) -> Result<StoredEvent, EventStoreError> {
        let pending = StoredEvent::record(event.clone(), outcome.clone(), Utc::now());
        let alert_codes: Option<Vec<i32>> = outcome.alerted().then(|| outcome.code_values());

        let recorded_at: DateTime<Utc> = sqlx::query(
            r#"
            INSERT INTO events (
                event_id,
                user_id,
                occurred_at,
                amount,
                kind,
                alerted,
                alert_codes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING recorded_at
            "#,
        )
        .bind(pending.event_id)
        .bind(event.user_id.get())
        .bind(event.occurred_at.seconds())
        .bind(event.amount.as_decimal())
        .bind(event.kind.as_str())
        .bind(outcome.alerted())
        .bind(alert_codes)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append", e))?
        .try_get("recorded_at")
        .map_err(|e| map_sqlx_error("append", e))?;

        Ok(StoredEvent {
            recorded_at,
            ..pending
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), EventStoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), EventStoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback_transaction", e))
    }
}

/// Map SQLx errors to EventStoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") => EventStoreError::Storage(format!("{msg} (foreign key)")),
                Some("23514") => EventStoreError::Storage(format!("{msg} (check constraint)")),
                _ => EventStoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            EventStoreError::Transaction(format!("no connection available in {operation}: {err}"))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            EventStoreError::CorruptRow(format!("{operation}: {err}"))
        }
        _ => EventStoreError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}

// SQLx row types

#[derive(Debug)]
struct StoredEventRow {
    event_id: uuid::Uuid,
    user_id: i64,
    occurred_at: i64,
    amount: Decimal,
    kind: String,
    alerted: bool,
    alert_codes: Option<Vec<i32>>,
    recorded_at: DateTime<Utc>,
}

impl StoredEventRow {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, EventStoreError> {
        let get_err = |e| map_sqlx_error("decode_event_row", e);
        Ok(StoredEventRow {
            event_id: row.try_get("event_id").map_err(get_err)?,
            user_id: row.try_get("user_id").map_err(get_err)?,
            occurred_at: row.try_get("occurred_at").map_err(get_err)?,
            amount: row.try_get("amount").map_err(get_err)?,
            kind: row.try_get("kind").map_err(get_err)?,
            alerted: row.try_get("alerted").map_err(get_err)?,
            alert_codes: row.try_get("alert_codes").map_err(get_err)?,
            recorded_at: row.try_get("recorded_at").map_err(get_err)?,
        })
    }
}

impl TryFrom<StoredEventRow> for StoredEvent {
    type Error = EventStoreError;

    fn try_from(row: StoredEventRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            EventStoreError::CorruptRow(format!("event {}: {what}: {e}", row.event_id))
        };

        let user_id = UserId::new(row.user_id).map_err(|e| corrupt("user_id", &e))?;
        let occurred_at = Timestamp::new(row.occurred_at).map_err(|e| corrupt("occurred_at", &e))?;
        let amount = Amount::new(row.amount).map_err(|e| corrupt("amount", &e))?;
        let kind: EventKind = row.kind.parse().map_err(|e| corrupt("kind", &e))?;
        let codes = row
            .alert_codes
            .unwrap_or_default()
            .into_iter()
            .map(AlertCode::from_code)
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|e| corrupt("alert_codes", &e))?;
        let outcome = AlertOutcome::from_parts(row.alerted, codes).map_err(|e| corrupt("outcome", &e))?;

        Ok(StoredEvent {
            event_id: row.event_id,
            event: TransactionEvent::new(user_id, occurred_at, amount, kind),
            outcome,
            recorded_at: row.recorded_at,
        })
    }
}
