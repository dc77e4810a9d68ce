//! Infrastructure layer: event storage, server clock, configuration and the
//! request processing pipeline.

pub mod clock;
pub mod config;
pub mod event_store;
pub mod processor;

mod integration_tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, DatabaseConfig};
pub use processor::{EventProcessor, ProcessError};
