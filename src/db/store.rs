use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{AppError, Result};

/// Shared, pooled handle to the listings database. Read-only from the
/// engine's point of view; every call is bounded by `timeout`.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    timeout: Duration,
}

impl Store {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub async fn open(db_path: &str, timeout: Duration) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        info!("Database ready at {db_path}");
        Ok(Self::new(pool, timeout))
    }

    /// Single-connection in-memory database; every connection of a memory
    /// pool would otherwise see its own empty database.
    pub async fn in_memory(timeout: Duration) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self::new(pool, timeout))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one store round-trip under the per-call timeout.
    pub(crate) async fn bounded<T, F>(&self, op: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                let timeout_ms = self.timeout.as_millis().min(u128::from(u64::MAX)) as u64;
                warn!(op, timeout_ms, "store call timed out");
                Err(AppError::Timeout { op, timeout_ms })
            }
        }
    }
}
