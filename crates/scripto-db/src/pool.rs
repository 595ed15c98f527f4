//! Connection pool for the interaction log.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use scripto_core::{defaults, Error, Result};

/// Pool sizing and timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a query waits for a free connection.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::DB_MAX_CONNECTIONS,
            min_connections: defaults::DB_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(defaults::DB_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(defaults::DB_IDLE_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `DATABASE_MAX_CONNECTIONS` | `10` | Pool size ceiling |
    /// | `DATABASE_MIN_CONNECTIONS` | `1` | Connections kept open, capped at the ceiling |
    /// | `DATABASE_ACQUIRE_TIMEOUT_SECS` | `30` | Wait for a free connection |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let positive = |name: &str| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|n| *n > 0)
        };

        let max_connections = positive("DATABASE_MAX_CONNECTIONS")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(defaults.max_connections);
        let min_connections = positive("DATABASE_MIN_CONNECTIONS")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(defaults.min_connections);
        let acquire_timeout = positive("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.acquire_timeout);

        Self {
            max_connections,
            min_connections: min_connections.min(max_connections),
            acquire_timeout,
            idle_timeout: defaults.idle_timeout,
        }
    }

    pub fn with_max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self.min_connections = self.min_connections.min(n);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Open a pool against `database_url`.
    pub async fn connect(&self, database_url: &str) -> Result<PgPool> {
        let start = Instant::now();
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .connect(database_url)
            .await
            .map_err(Error::Database)?;

        info!(
            subsystem = "database",
            component = "pool",
            op = "connect",
            max_connections = self.max_connections,
            pool_size = pool.size(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Database pool ready"
        );
        Ok(pool)
    }
}

/// Open a pool with default settings.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    PoolConfig::default().connect(database_url).await
}
