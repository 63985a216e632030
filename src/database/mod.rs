//! Database connection and pool configuration for SQLite.

mod statement_cache;

pub use statement_cache::StatementCache;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Connection pool sizing, per the documented resource model.
const MAX_CONNECTIONS: u32 = 25;
const MIN_CONNECTIONS: u32 = 5;
const MAX_LIFETIME: Duration = Duration::from_secs(5 * 60);
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Database handle wrapping the SQLite pool plus the process-wide
/// prepared-statement cache.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    statement_cache: StatementCache,
}

impl Database {
    /// Open a database from either `DATABASE_PATH` (a filesystem path) or
    /// `DATABASE_URL` (a full `sqlite:` URL). The two are mutually exclusive.
    pub async fn connect(database_path: Option<&str>, database_url: Option<&str>) -> Result<Self> {
        let url = match (database_path, database_url) {
            (Some(_), Some(_)) => {
                return Err(Error::Configuration(
                    "DATABASE_PATH and DATABASE_URL are mutually exclusive".into(),
                ))
            }
            (Some(path), None) => format!("sqlite://{path}"),
            (None, Some(url)) => url.to_string(),
            (None, None) => {
                return Err(Error::Configuration(
                    "one of DATABASE_PATH or DATABASE_URL is required".into(),
                ))
            }
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| Error::Configuration(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS as u64));

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(MIN_CONNECTIONS)
            .max_lifetime(MAX_LIFETIME)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"))
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("failed to connect: {e}")))?;

        Ok(Self {
            pool,
            statement_cache: StatementCache::new(50),
        })
    }

    /// Open an in-memory database, used by integration tests in place of the
    /// teacher's `testcontainers`-backed Postgres fixture.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::connect(None, Some("sqlite::memory:")).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn statement_cache(&self) -> &StatementCache {
        &self.statement_cache
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Health check used by `/health` and `/ready`.
    pub async fn health_check(&self) -> Result<HealthStatus> {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                is_healthy: true,
                message: "connected".to_string(),
            }),
            Err(e) => Ok(HealthStatus {
                is_healthy: false,
                message: format!("connection failed: {e}"),
            }),
        }
    }
}

#[derive(Debug)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_both_path_and_url() {
        let err = Database::connect(Some("/tmp/x.db"), Some("sqlite::memory:"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn connects_in_memory_and_migrates() {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let status = db.health_check().await.unwrap();
        assert!(status.is_healthy);
    }
}
