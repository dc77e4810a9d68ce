//! Postgres event store tests.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p fraudwatch-infra -- --ignored`.

use std::sync::Arc;

use fraudwatch_core::{AlertOutcome, Amount, EventKind, Timestamp, TransactionEvent, UserId};
use fraudwatch_infra::event_store::{EventQuery, EventStore, Pagination, PostgresEventStore};
use fraudwatch_infra::{DatabaseConfig, EventProcessor, FixedClock, ProcessError};
use fraudwatch_rules::RuleEngine;

const NOW: i64 = 1_700_000_000;

async fn store() -> Option<PostgresEventStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let store = PostgresEventStore::connect(&DatabaseConfig::from_url(url))
        .await
        .unwrap();
    store.ensure_schema().await.unwrap();
    Some(store)
}

/// A user id no other test run has used.
fn fresh_user() -> UserId {
    let raw = (uuid::Uuid::now_v7().as_u128() & 0x3fff_ffff_ffff_ffff) as i64;
    UserId::new(raw.max(1)).unwrap()
}

fn event(user_id: UserId, t: i64, amount: &str, kind: EventKind) -> TransactionEvent {
    TransactionEvent::new(
        user_id,
        Timestamp::new(t).unwrap(),
        Amount::parse(amount).unwrap(),
        kind,
    )
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn append_round_trips_through_window_queries() {
    let Some(store) = store().await else { return };
    let user_id = fresh_user();
    store.register_user(user_id).await.unwrap();

    let mut scope = store.begin().await.unwrap();
    let stored = scope
        .append(&event(user_id, NOW, "20.05", EventKind::Deposit), &AlertOutcome::clear())
        .await
        .unwrap();
    scope.commit().await.unwrap();

    let mut scope = store.begin().await.unwrap();
    let since = Timestamp::from_unix(NOW - 30);
    assert_eq!(
        scope.deposit_sum(user_id, since).await.unwrap(),
        Amount::parse("20.05").unwrap()
    );
    let deposits = scope.last_two_deposits(user_id, since).await.unwrap();
    assert_eq!(deposits.len(), 1);
    assert_eq!(deposits[0].occurred_at, stored.occurred_at());
    scope.rollback().await.unwrap();

    let page = store
        .events_for_user(user_id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.events[0].event_id, stored.event_id);
    assert_eq!(page.events[0].event, stored.event);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn dropped_scope_rolls_back() {
    let Some(store) = store().await else { return };
    let user_id = fresh_user();
    store.register_user(user_id).await.unwrap();

    {
        let mut scope = store.begin().await.unwrap();
        scope
            .append(&event(user_id, NOW, "1.00", EventKind::Withdraw), &AlertOutcome::clear())
            .await
            .unwrap();
    }

    let page = store
        .events_for_user(user_id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn processor_scenarios_against_postgres() {
    let Some(store) = store().await else { return };
    let user_id = fresh_user();
    store.register_user(user_id).await.unwrap();
    let clock = Arc::new(FixedClock::new(Timestamp::from_unix(NOW)));
    let processor = EventProcessor::new(store.clone(), clock, RuleEngine::default());

    for (offset, expected) in [(2, vec![]), (1, vec![]), (0, vec![30])] {
        let outcome = processor
            .process(&event(user_id, NOW - offset, "20.01", EventKind::Withdraw))
            .await
            .unwrap();
        assert_eq!(outcome.code_values(), expected);
    }

    let outcome = processor
        .process(&event(user_id, NOW, "200.10", EventKind::Withdraw))
        .await
        .unwrap();
    assert_eq!(outcome.code_values(), vec![30, 1100]);

    let page = store
        .events_for_user(user_id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    assert!(page.events.iter().all(|e| e.outcome.ensure_consistent().is_ok()));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn amounts_beyond_eighteen_digits_are_stored() {
    let Some(store) = store().await else { return };
    let user_id = fresh_user();
    store.register_user(user_id).await.unwrap();
    let processor = EventProcessor::new(
        store.clone(),
        FixedClock::new(Timestamp::from_unix(NOW)),
        RuleEngine::default(),
    );

    let large = "1000000000000000000.00";
    let outcome = processor
        .process(&event(user_id, NOW, large, EventKind::Deposit))
        .await
        .unwrap();
    assert_eq!(outcome.code_values(), vec![123]);

    let page = store
        .events_for_user(user_id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.events.len(), 1);
    assert_eq!(page.events[0].event.amount, Amount::parse(large).unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn unknown_user_is_not_found() {
    let Some(store) = store().await else { return };
    let processor = EventProcessor::new(
        store,
        FixedClock::new(Timestamp::from_unix(NOW)),
        RuleEngine::default(),
    );

    let err = processor
        .process(&event(fresh_user(), NOW, "1.00", EventKind::Deposit))
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::NotFound(_)));
}
