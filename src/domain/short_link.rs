//! ShortLink entity and repository.
//!
//! A one-shot redirect wrapping a signed report token: `id` is the short
//! code handed out in the messenger reply, `target_token` is the full
//! signed token it resolves to. Rows past `expires_at` are treated as
//! absent and swept periodically by `purge_expired`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::types::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShortLink {
    pub id: String,
    pub target_token: String,
    pub expires_at: Timestamp,
}

#[async_trait]
pub trait ShortLinkRepository: Send + Sync {
    async fn create(&self, id: &str, target_token: &str, expires_at: DateTime<Utc>) -> Result<ShortLink>;

    /// Returns `None` if the id doesn't exist or has expired.
    async fn resolve(&self, id: &str) -> Result<Option<ShortLink>>;

    async fn purge_expired(&self) -> Result<u64>;
}

pub struct SqliteShortLinkRepository {
    pool: SqlitePool,
}

impl SqliteShortLinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShortLinkRepository for SqliteShortLinkRepository {
    async fn create(&self, id: &str, target_token: &str, expires_at: DateTime<Utc>) -> Result<ShortLink> {
        let expires_at = Timestamp::from_utc(expires_at);
        sqlx::query(
            "INSERT INTO short_links (id, target_token, expires_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT (id) DO UPDATE SET target_token = excluded.target_token, expires_at = excluded.expires_at",
        )
        .bind(id)
        .bind(target_token)
        .bind(expires_at.to_sqlite_string())
        .execute(&self.pool)
        .await?;

        Ok(ShortLink {
            id: id.to_string(),
            target_token: target_token.to_string(),
            expires_at,
        })
    }

    async fn resolve(&self, id: &str) -> Result<Option<ShortLink>> {
        let now = Timestamp::now().to_sqlite_string();
        let link = sqlx::query_as::<_, ShortLink>(
            "SELECT id, target_token, expires_at FROM short_links WHERE id = ?1 AND expires_at > ?2",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(link)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = Timestamp::now().to_sqlite_string();
        let result = sqlx::query("DELETE FROM short_links WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
