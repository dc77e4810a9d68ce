//! Configuration loading and representation.
//!
//! Everything is read once at start-up into explicit structs; nothing here is global.
//! Lookups go through a closure so tests can supply variables without touching the
//! process environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Parse an optional variable, falling back to `default` when unset or blank.
pub fn parse_or<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).map(|raw| raw.trim().to_owned()) {
        None => Ok(default),
        Some(raw) if raw.is_empty() => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}

#[derive(Clone, PartialEq, Eq)]
enum ConnectionTarget {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    },
}

/// How to reach Postgres.
///
/// Either `DATABASE_URL`, or all five of `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASS`,
/// `DB_NAME`. The URL wins when both are present.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    target: ConnectionTarget,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

const PART_VARS: [&str; 5] = ["DB_HOST", "DB_PORT", "DB_USER", "DB_PASS", "DB_NAME"];

impl DatabaseConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            target: ConnectionTarget::Url(url.into()),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(Self::DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }

    /// Read from the process environment. `Ok(None)` when no database is configured.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let target = if let Some(url) = present("DATABASE_URL") {
            ConnectionTarget::Url(url)
        } else if PART_VARS.iter().any(|var| present(*var).is_some()) {
            let require = |var: &'static str| present(var).ok_or(ConfigError::Missing(var));
            ConnectionTarget::Parts {
                host: require("DB_HOST")?,
                port: require("DB_PORT")?.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid {
                        var: "DB_PORT",
                        reason: e.to_string(),
                    }
                })?,
                user: require("DB_USER")?,
                password: require("DB_PASS")?,
                database: require("DB_NAME")?,
            }
        } else {
            return Ok(None);
        };

        let max_connections =
            parse_or(&lookup, "DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS",
                reason: "must be at least 1".to_owned(),
            });
        }
        let acquire_timeout_secs = parse_or(
            &lookup,
            "DB_ACQUIRE_TIMEOUT_SECS",
            Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
        )?;

        Ok(Some(Self {
            target,
            max_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
        }))
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        match &self.target {
            ConnectionTarget::Url(url) => {
                PgConnectOptions::from_str(url).map_err(|e| ConfigError::Invalid {
                    var: "DATABASE_URL",
                    reason: e.to_string(),
                })
            }
            ConnectionTarget::Parts {
                host,
                port,
                user,
                password,
                database,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(database)),
        }
    }

    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

// Credentials never reach logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.target {
            ConnectionTarget::Url(_) => "DATABASE_URL=<redacted>".to_owned(),
            ConnectionTarget::Parts {
                host,
                port,
                user,
                database,
                ..
            } => format!("{user}@{host}:{port}/{database}"),
        };
        f.debug_struct("DatabaseConfig")
            .field("target", &target)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}
