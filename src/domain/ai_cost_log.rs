//! AiCostLog entity and repository.
//!
//! Append-only, one row per LLM call. Aggregation queries back the
//! `/api/metrics/ai-costs` admin surface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::ids::{self, AI_COST_LOG_PREFIX};
use crate::types::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AiCostLog {
    pub id: String,
    pub user_id: String,
    pub operation: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    pub cost: f64,
    pub currency: String,
    pub created_at: Timestamp,
}

pub struct NewAiCostLog {
    pub user_id: String,
    pub operation: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CostAggregate {
    pub provider: String,
    pub model: String,
    pub call_count: i64,
    pub total_tokens: i64,
    pub total_cost: f64,
}

#[async_trait]
pub trait AiCostLogRepository: Send + Sync {
    async fn record(&self, new: NewAiCostLog) -> Result<AiCostLog>;

    async fn aggregate_by_provider_model(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<CostAggregate>>;

    async fn for_user(&self, user_id: &str, limit: i64) -> Result<Vec<AiCostLog>>;
}

pub struct SqliteAiCostLogRepository {
    pool: SqlitePool,
}

impl SqliteAiCostLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AiCostLogRepository for SqliteAiCostLogRepository {
    async fn record(&self, new: NewAiCostLog) -> Result<AiCostLog> {
        let now = Timestamp::now();
        let total_tokens = new.input_tokens + new.output_tokens;
        let id = ids::generate_id(
            AI_COST_LOG_PREFIX,
            &[&new.user_id, &new.operation, &now.to_sqlite_string()],
        );

        sqlx::query(
            r#"
            INSERT INTO ai_cost_logs (
                id, user_id, operation, provider, model,
                input_tokens, output_tokens, total_tokens, cost, currency, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&id)
        .bind(&new.user_id)
        .bind(&new.operation)
        .bind(&new.provider)
        .bind(&new.model)
        .bind(new.input_tokens)
        .bind(new.output_tokens)
        .bind(total_tokens)
        .bind(new.cost)
        .bind(&new.currency)
        .bind(now.to_sqlite_string())
        .execute(&self.pool)
        .await?;

        Ok(AiCostLog {
            id,
            user_id: new.user_id,
            operation: new.operation,
            provider: new.provider,
            model: new.model,
            input_tokens: new.input_tokens,
            output_tokens: new.output_tokens,
            total_tokens,
            cost: new.cost,
            currency: new.currency,
            created_at: now,
        })
    }

    async fn aggregate_by_provider_model(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<CostAggregate>> {
        let since = Timestamp::from_utc(since).to_sqlite_string();
        let rows = sqlx::query_as::<_, CostAggregate>(
            r#"
            SELECT provider, model,
                   COUNT(*) AS call_count,
                   SUM(total_tokens) AS total_tokens,
                   SUM(cost) AS total_cost
            FROM ai_cost_logs
            WHERE created_at >= ?1
            GROUP BY provider, model
            ORDER BY total_cost DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn for_user(&self, user_id: &str, limit: i64) -> Result<Vec<AiCostLog>> {
        let rows = sqlx::query_as::<_, AiCostLog>(
            "SELECT id, user_id, operation, provider, model, input_tokens, output_tokens, \
             total_tokens, cost, currency, created_at FROM ai_cost_logs \
             WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
