//! ExchangeRate entity and repository.
//!
//! Global, process-wide registry (not scoped to a user). Lookup policy used
//! by `usecases::currency`: exact-day rate first, else
//! newest rate on or before the requested date.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::types::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExchangeRate {
    pub provider: String,
    pub base: String,
    pub target: String,
    pub rate: f64,
    pub rate_date: Timestamp,
    pub fetched_at: Timestamp,
}

#[async_trait]
pub trait ExchangeRateRepository: Send + Sync {
    async fn upsert(&self, rate: &ExchangeRate) -> Result<()>;

    async fn get_exact(
        &self,
        base: &str,
        target: &str,
        date: DateTime<Utc>,
    ) -> Result<Option<ExchangeRate>>;

    /// Newest rate with `rate_date <= before`.
    async fn get_most_recent_rate(
        &self,
        base: &str,
        target: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<ExchangeRate>>;
}

pub struct SqliteExchangeRateRepository {
    pool: SqlitePool,
}

impl SqliteExchangeRateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExchangeRateRepository for SqliteExchangeRateRepository {
    async fn upsert(&self, rate: &ExchangeRate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exchange_rates (provider, base, target, rate, rate_date, fetched_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (provider, base, target, rate_date)
            DO UPDATE SET rate = excluded.rate, fetched_at = excluded.fetched_at
            "#,
        )
        .bind(&rate.provider)
        .bind(&rate.base)
        .bind(&rate.target)
        .bind(rate.rate)
        .bind(rate.rate_date.to_sqlite_string())
        .bind(rate.fetched_at.to_sqlite_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_exact(
        &self,
        base: &str,
        target: &str,
        date: DateTime<Utc>,
    ) -> Result<Option<ExchangeRate>> {
        let date = Timestamp::from_utc(date).to_sqlite_string();
        let rate = sqlx::query_as::<_, ExchangeRate>(
            "SELECT provider, base, target, rate, rate_date, fetched_at FROM exchange_rates \
             WHERE base = ?1 AND target = ?2 AND rate_date = ?3 \
             ORDER BY fetched_at DESC LIMIT 1",
        )
        .bind(base)
        .bind(target)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rate)
    }

    async fn get_most_recent_rate(
        &self,
        base: &str,
        target: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<ExchangeRate>> {
        let before = Timestamp::from_utc(before).to_sqlite_string();
        let rate = sqlx::query_as::<_, ExchangeRate>(
            "SELECT provider, base, target, rate, rate_date, fetched_at FROM exchange_rates \
             WHERE base = ?1 AND target = ?2 AND rate_date <= ?3 \
             ORDER BY rate_date DESC, fetched_at DESC LIMIT 1",
        )
        .bind(base)
        .bind(target)
        .bind(before)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rate)
    }
}
