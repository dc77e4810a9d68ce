//! Append-only event store boundary.
//!
//! This module defines the atomic read-decide-append scope used by the processor,
//! plus a read-only query side for inspecting a user's log. Two backends ship here:
//! an in-memory store for tests and local runs, and Postgres.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::{EventPage, EventQuery, Pagination};
pub use r#trait::{EventStore, EventStoreError, UnitOfWork};
