//! PostgreSQL pool for the bookmark store.
//!
//! The pool is sized for the API process: handlers and the capture workers
//! share it, so `max_connections` should cover the capture concurrency plus
//! a few connections for interactive requests.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use tabmark_core::{Error, Result};

const MAX_CONNECTIONS_VAR: &str = "DATABASE_MAX_CONNECTIONS";
const CONNECT_TIMEOUT_VAR: &str = "DATABASE_CONNECT_TIMEOUT_SECS";

/// Pool sizing and timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// How long to wait for a free connection before failing the query.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Defaults overridden by `DATABASE_MAX_CONNECTIONS` and
    /// `DATABASE_CONNECT_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Unparsable values and a zero connection count keep the default.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(n) = lookup(MAX_CONNECTIONS_VAR)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
        {
            config.max_connections = n;
        }
        if let Some(secs) = lookup(CONNECT_TIMEOUT_VAR).and_then(|v| v.trim().parse::<u64>().ok()) {
            config.acquire_timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// Open the pool and wait for the first connection.
pub async fn connect_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    info!(
        subsystem = "database",
        component = "pool",
        op = "create",
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        "Opening bookmark store pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Bookmark store pool ready"
    );
    Ok(pool)
}

/// Called from the health check; warns when every connection is checked out.
pub fn log_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();

    debug!(
        subsystem = "database",
        component = "pool",
        pool_size = size,
        pool_idle = idle,
        "Pool usage"
    );

    if idle == 0 && size > 0 {
        warn!(
            subsystem = "database",
            component = "pool",
            pool_size = size,
            "No idle connections left in the bookmark store pool"
        );
    }
}
