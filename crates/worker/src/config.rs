use anyhow::Context;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Connection pool size (default: `20`).
    pub db_max_connections: u32,
    /// Event bus buffer size (default: `1024`).
    pub event_bus_capacity: usize,
    /// Extra attempts of a counter update after losing a concurrent write
    /// (default: `3`).
    pub counter_update_retries: u32,
}

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_COUNTER_UPDATE_RETRIES: u32 = 3;

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default  |
    /// |--------------------------|----------|
    /// | `DATABASE_URL`           | required |
    /// | `DB_MAX_CONNECTIONS`     | `20`     |
    /// | `EVENT_BUS_CAPACITY`     | `1024`   |
    /// | `COUNTER_UPDATE_RETRIES` | `3`      |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse::<u32>().context("DB_MAX_CONNECTIONS must be a valid u32")?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };
        let event_bus_capacity = match lookup("EVENT_BUS_CAPACITY") {
            Some(v) => v.parse::<usize>().context("EVENT_BUS_CAPACITY must be a valid usize")?,
            None => geti_events::DEFAULT_CAPACITY,
        };
        anyhow::ensure!(event_bus_capacity > 0, "EVENT_BUS_CAPACITY must be positive");
        let counter_update_retries = match lookup("COUNTER_UPDATE_RETRIES") {
            Some(v) => v.parse::<u32>().context("COUNTER_UPDATE_RETRIES must be a valid u32")?,
            None => DEFAULT_COUNTER_UPDATE_RETRIES,
        };

        Ok(Self {
            database_url,
            db_max_connections,
            event_bus_capacity,
            counter_update_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<WorkerConfig> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        WorkerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/geti")]).unwrap();
        assert_eq!(config.db_max_connections, 20);
        assert_eq!(config.event_bus_capacity, 1024);
        assert_eq!(config.counter_update_retries, 3);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/geti"),
            ("DB_MAX_CONNECTIONS", "5"),
            ("EVENT_BUS_CAPACITY", "64"),
            ("COUNTER_UPDATE_RETRIES", "0"),
        ])
        .unwrap();
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.event_bus_capacity, 64);
        assert_eq!(config.counter_update_retries, 0);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn malformed_number_is_an_error() {
        assert!(load(&[("DATABASE_URL", "x"), ("COUNTER_UPDATE_RETRIES", "many")]).is_err());
        assert!(load(&[("DATABASE_URL", "x"), ("EVENT_BUS_CAPACITY", "0")]).is_err());
    }
}
