//! Policy entity and repository.
//!
//! Read-only legal text (terms, privacy policy) keyed by a stable slug.
//! Static content, not part of the conversational flow — kept here only
//! because the admin surface exposes a read endpoint over it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::types::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Policy {
    pub key: String,
    pub title: String,
    pub content: String,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Policy>>;

    async fn upsert(&self, key: &str, title: &str, content: &str) -> Result<Policy>;
}

pub struct SqlitePolicyRepository {
    pool: SqlitePool,
}

impl SqlitePolicyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyRepository for SqlitePolicyRepository {
    async fn get(&self, key: &str) -> Result<Option<Policy>> {
        let policy = sqlx::query_as::<_, Policy>(
            "SELECT key, title, content, version, created_at, updated_at FROM policies WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(policy)
    }

    async fn upsert(&self, key: &str, title: &str, content: &str) -> Result<Policy> {
        let now = Timestamp::now();
        sqlx::query(
            r#"
            INSERT INTO policies (key, title, content, version, created_at, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?4)
            ON CONFLICT (key) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                version = policies.version + 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(title)
        .bind(content)
        .bind(now.to_sqlite_string())
        .execute(&self.pool)
        .await?;

        self.get(key).await?.ok_or_else(|| {
            crate::error::Error::Invariant(format!("policy {key} missing immediately after upsert"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn upsert_increments_version_on_update() {
        let repo = SqlitePolicyRepository::new(pool().await);
        let first = repo.upsert("terms", "Terms of Service", "v1 text").await.unwrap();
        assert_eq!(first.version, 1);

        let second = repo.upsert("terms", "Terms of Service", "v2 text").await.unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.content, "v2 text");
    }
}
