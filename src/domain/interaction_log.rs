//! InteractionLog entity and repository.
//!
//! Append-only record of every conversational turn, including the raw LLM
//! response and any error — used for debugging parse failures and for the
//! admin interaction-history surface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::ids::{self, INTERACTION_LOG_PREFIX};
use crate::types::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InteractionLog {
    pub id: String,
    pub user_id: String,
    pub user_input: String,
    pub system_prompt: Option<String>,
    pub ai_raw_response: Option<String>,
    pub bot_final_reply: String,
    pub duration_ms: i64,
    pub error: Option<String>,
    pub timestamp: Timestamp,
}

pub struct NewInteractionLog {
    pub user_id: String,
    pub user_input: String,
    pub system_prompt: Option<String>,
    pub ai_raw_response: Option<String>,
    pub bot_final_reply: String,
    pub duration_ms: i64,
    pub error: Option<String>,
}

#[async_trait]
pub trait InteractionLogRepository: Send + Sync {
    async fn record(&self, new: NewInteractionLog) -> Result<InteractionLog>;

    async fn for_user(&self, user_id: &str, limit: i64) -> Result<Vec<InteractionLog>>;
}

pub struct SqliteInteractionLogRepository {
    pool: SqlitePool,
}

impl SqliteInteractionLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionLogRepository for SqliteInteractionLogRepository {
    async fn record(&self, new: NewInteractionLog) -> Result<InteractionLog> {
        let now = Timestamp::now();
        let id = ids::generate_id(
            INTERACTION_LOG_PREFIX,
            &[&new.user_id, &new.user_input, &now.to_sqlite_string()],
        );

        sqlx::query(
            r#"
            INSERT INTO interaction_logs (
                id, user_id, user_input, system_prompt, ai_raw_response,
                bot_final_reply, duration_ms, error, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&id)
        .bind(&new.user_id)
        .bind(&new.user_input)
        .bind(&new.system_prompt)
        .bind(&new.ai_raw_response)
        .bind(&new.bot_final_reply)
        .bind(new.duration_ms)
        .bind(&new.error)
        .bind(now.to_sqlite_string())
        .execute(&self.pool)
        .await?;

        Ok(InteractionLog {
            id,
            user_id: new.user_id,
            user_input: new.user_input,
            system_prompt: new.system_prompt,
            ai_raw_response: new.ai_raw_response,
            bot_final_reply: new.bot_final_reply,
            duration_ms: new.duration_ms,
            error: new.error,
            timestamp: now,
        })
    }

    async fn for_user(&self, user_id: &str, limit: i64) -> Result<Vec<InteractionLog>> {
        let rows = sqlx::query_as::<_, InteractionLog>(
            "SELECT id, user_id, user_input, system_prompt, ai_raw_response, \
             bot_final_reply, duration_ms, error, timestamp FROM interaction_logs \
             WHERE user_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
