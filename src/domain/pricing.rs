//! PricingConfig entity and repository.
//!
//! Append-only: rows are never updated in place except for the
//! `is_active` flag flipping off during a deactivate-before-insert cycle.
//! The per-model sync state machine itself lives in `pricing::state_machine`;
//! this module only exposes the storage primitives it's built from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::ids::{self, PRICING_CONFIG_PREFIX};
use crate::types::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PricingConfig {
    pub id: String,
    pub provider: String,
    pub model: String,
    pub input_token_price: f64,
    pub output_token_price: f64,
    pub currency: String,
    pub effective_date: Timestamp,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

pub struct NewPricingConfig {
    pub provider: String,
    pub model: String,
    pub input_token_price: f64,
    pub output_token_price: f64,
    pub currency: String,
    pub effective_date: DateTime<Utc>,
}

#[async_trait]
pub trait PricingRepository: Send + Sync {
    /// The single active row with `effective_date <= now`, newest first, or
    /// `None` — never an error — when there isn't one.
    async fn get_by_provider_and_model(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<Option<PricingConfig>>;

    async fn insert(&self, new: NewPricingConfig) -> Result<PricingConfig>;

    /// Deactivates every active row for `(provider, model)`. Idempotent: a
    /// second call with nothing active affects zero rows and still succeeds.
    async fn deactivate(&self, provider: &str, model: &str) -> Result<()>;

    async fn history(&self, provider: &str, model: &str) -> Result<Vec<PricingConfig>>;
}

pub struct SqlitePricingRepository {
    pool: SqlitePool,
}

impl SqlitePricingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PricingRepository for SqlitePricingRepository {
    async fn get_by_provider_and_model(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<Option<PricingConfig>> {
        let now = Timestamp::now().to_sqlite_string();
        let config = sqlx::query_as::<_, PricingConfig>(
            r#"
            SELECT id, provider, model, input_token_price, output_token_price,
                   currency, effective_date, is_active, created_at, updated_at
            FROM pricing_configs
            WHERE provider = ?1 AND model = ?2 AND is_active = 1 AND effective_date <= ?3
            ORDER BY effective_date DESC
            LIMIT 1
            "#,
        )
        .bind(provider)
        .bind(model)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(config)
    }

    async fn insert(&self, new: NewPricingConfig) -> Result<PricingConfig> {
        let now = Timestamp::now();
        let effective_date = Timestamp::from_utc(new.effective_date);
        let id = ids::generate_id(
            PRICING_CONFIG_PREFIX,
            &[&new.provider, &new.model, &effective_date.to_sqlite_string()],
        );

        sqlx::query(
            r#"
            INSERT INTO pricing_configs (
                id, provider, model, input_token_price, output_token_price,
                currency, effective_date, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9)
            "#,
        )
        .bind(&id)
        .bind(&new.provider)
        .bind(&new.model)
        .bind(new.input_token_price)
        .bind(new.output_token_price)
        .bind(&new.currency)
        .bind(effective_date.to_sqlite_string())
        .bind(now.to_sqlite_string())
        .bind(now.to_sqlite_string())
        .execute(&self.pool)
        .await?;

        Ok(PricingConfig {
            id,
            provider: new.provider,
            model: new.model,
            input_token_price: new.input_token_price,
            output_token_price: new.output_token_price,
            currency: new.currency,
            effective_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    async fn deactivate(&self, provider: &str, model: &str) -> Result<()> {
        let now = Timestamp::now().to_sqlite_string();
        sqlx::query(
            "UPDATE pricing_configs SET is_active = 0, updated_at = ?1 \
             WHERE provider = ?2 AND model = ?3 AND is_active = 1",
        )
        .bind(now)
        .bind(provider)
        .bind(model)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn history(&self, provider: &str, model: &str) -> Result<Vec<PricingConfig>> {
        let rows = sqlx::query_as::<_, PricingConfig>(
            r#"
            SELECT id, provider, model, input_token_price, output_token_price,
                   currency, effective_date, is_active, created_at, updated_at
            FROM pricing_configs
            WHERE provider = ?1 AND model = ?2
            ORDER BY effective_date DESC
            "#,
        )
        .bind(provider)
        .bind(model)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn config(effective: DateTime<Utc>, price: f64) -> NewPricingConfig {
        NewPricingConfig {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            input_token_price: price,
            output_token_price: price * 2.0,
            currency: "USD".to_string(),
            effective_date: effective,
        }
    }

    #[tokio::test]
    async fn at_most_one_active_row_survives_deactivate_then_insert() {
        let repo = SqlitePricingRepository::new(pool().await);
        let d1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();

        repo.insert(config(d1, 0.001)).await.unwrap();
        repo.deactivate("openai", "gpt-4o").await.unwrap();
        repo.insert(config(d2, 0.002)).await.unwrap();

        let active = repo.get_by_provider_and_model("openai", "gpt-4o").await.unwrap().unwrap();
        assert_eq!(active.input_token_price, 0.002);

        let history = repo.history("openai", "gpt-4o").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().filter(|c| c.is_active).count(), 1);
    }

    #[tokio::test]
    async fn deactivate_on_nothing_active_is_a_no_op() {
        let repo = SqlitePricingRepository::new(pool().await);
        repo.deactivate("openai", "gpt-4o").await.unwrap();
        assert!(repo.get_by_provider_and_model("openai", "gpt-4o").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_by_provider_and_model_ignores_future_effective_dates() {
        let repo = SqlitePricingRepository::new(pool().await);
        let future = Utc::now() + chrono::Duration::days(365);
        repo.insert(config(future, 0.005)).await.unwrap();
        assert!(repo.get_by_provider_and_model("openai", "gpt-4o").await.unwrap().is_none());
    }
}
