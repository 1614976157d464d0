//! Connection settings read from the environment.

use std::fmt;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

const DATABASE_URL: &str = "DATABASE_URL";
const DATABASE_MAX_CONNECTIONS: &str = "DATABASE_MAX_CONNECTIONS";
const DATABASE_ACQUIRE_TIMEOUT_SECS: &str = "DATABASE_ACQUIRE_TIMEOUT_SECS";

/// Errors raised while reading [`PgStoreConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        /// The environment variable name.
        key: &'static str,
        /// What the value should look like.
        expected: &'static str,
        /// The raw value that was read.
        value: String,
    },
}

/// Settings for the PostgreSQL connection pool.
#[derive(Clone, PartialEq, Eq)]
pub struct PgStoreConfig {
    /// Connection string, from `DATABASE_URL`.
    pub database_url: String,
    /// Pool size cap, from `DATABASE_MAX_CONNECTIONS` (default 10).
    pub max_connections: u32,
    /// How long to wait for a pooled connection, from
    /// `DATABASE_ACQUIRE_TIMEOUT_SECS` (default 5s).
    pub acquire_timeout: Duration,
}

impl PgStoreConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`from_lookup`](Self::from_lookup).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// `DATABASE_URL` is required; `DATABASE_MAX_CONNECTIONS` defaults to 10
    /// and `DATABASE_ACQUIRE_TIMEOUT_SECS` to 5.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` without a database URL and
    /// `ConfigError::Invalid` for values that are not positive integers.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup(DATABASE_URL)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing(DATABASE_URL))?;
        let max_connections = parse_positive(&lookup, DATABASE_MAX_CONNECTIONS, 10)?;
        let acquire_timeout_secs = parse_positive(&lookup, DATABASE_ACQUIRE_TIMEOUT_SECS, 5)?;

        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout: Duration::from_secs(u64::from(acquire_timeout_secs)),
        })
    }

    /// Opens a connection pool with these settings.
    ///
    /// # Errors
    ///
    /// Returns the underlying `sqlx::Error` if the database is unreachable.
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.database_url)
            .await
    }
}

impl fmt::Debug for PgStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The URL may carry credentials.
        f.debug_struct("PgStoreConfig")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish_non_exhaustive()
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u32>() {
            Ok(parsed) if parsed > 0 => Ok(parsed),
            _ => Err(ConfigError::Invalid {
                key,
                expected: "a positive integer",
                value,
            }),
        },
    }
}
