//! Process configuration for the HTTP service.

use std::net::SocketAddr;

use fraudwatch_core::UserId;
use fraudwatch_infra::config::parse_or;
use fraudwatch_infra::{ConfigError, DatabaseConfig};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// `None` runs against the in-memory store.
    pub database: Option<DatabaseConfig>,
    /// Users registered at start-up. The account directory is otherwise managed elsewhere.
    pub seed_user_ids: Vec<UserId>,
}

impl ApiConfig {
    /// `0.0.0.0:8000`
    pub fn default_bind_addr() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 8000))
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or(&lookup, "BIND_ADDR", Self::default_bind_addr())?;
        let seed_user_ids = parse_user_ids(lookup("SEED_USER_IDS").as_deref().unwrap_or("1"))?;
        let database = DatabaseConfig::from_lookup(&lookup)?;

        Ok(Self {
            bind_addr,
            database,
            seed_user_ids,
        })
    }
}

fn parse_user_ids(raw: &str) -> Result<Vec<UserId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<UserId>().map_err(|e| ConfigError::Invalid {
                var: "SEED_USER_IDS",
                reason: format!("{part:?}: {e}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_to_in_memory_on_port_8000_with_user_1() {
        let cfg = ApiConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8000);
        assert!(cfg.database.is_none());
        assert_eq!(cfg.seed_user_ids, vec![UserId::new(1).unwrap()]);
    }

    #[test]
    fn seed_list_is_comma_separated() {
        let cfg = ApiConfig::from_lookup(env(&[("SEED_USER_IDS", "1, 2,,7")])).unwrap();
        let ids: Vec<i64> = cfg.seed_user_ids.iter().map(|id| id.get()).collect();
        assert_eq!(ids, vec![1, 2, 7]);

        let cfg = ApiConfig::from_lookup(env(&[("SEED_USER_IDS", "")])).unwrap();
        assert!(cfg.seed_user_ids.is_empty());
    }

    #[test]
    fn bad_seed_or_addr_is_rejected() {
        let err = ApiConfig::from_lookup(env(&[("SEED_USER_IDS", "1,0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SEED_USER_IDS", .. }));

        let err = ApiConfig::from_lookup(env(&[("BIND_ADDR", "nowhere")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "BIND_ADDR", .. }));
    }

    #[test]
    fn database_is_picked_up() {
        let cfg = ApiConfig::from_lookup(env(&[("DATABASE_URL", "postgres://localhost/fraud")]))
            .unwrap();
        assert!(cfg.database.is_some());
    }
}
