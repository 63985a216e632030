//! User entity and repository.
//!
//! `user_id` is always platform-prefixed (`slack_U123`, `telegram_42`, a raw
//! phone number for WhatsApp) so identities from different platforms never
//! collide — see `messengers::namespaced_user_id`. A user is created exactly
//! once per external identity and never deleted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::types::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: String,
    pub messenger_type: String,
    pub home_currency: String,
    pub locale: String,
    pub created_at: Timestamp,
}

pub const DEFAULT_HOME_CURRENCY: &str = "TWD";
pub const DEFAULT_LOCALE: &str = "en";

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Returns `Ok(false)` instead of erroring when the row
    /// already exists (the unique-key conflict is the idempotency
    /// mechanism `AutoSignup` relies on for racing callers).
    async fn create_if_absent(&self, user_id: &str, messenger_type: &str) -> Result<bool>;

    async fn get_by_id(&self, user_id: &str) -> Result<Option<User>>;

    /// Users created on or after `since` — backs the admin growth metric.
    async fn count_since(&self, since: crate::types::Timestamp) -> Result<i64>;
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create_if_absent(&self, user_id: &str, messenger_type: &str) -> Result<bool> {
        let now = Timestamp::now().to_sqlite_string();
        let result = sqlx::query(
            r#"
            INSERT INTO users (user_id, messenger_type, home_currency, locale, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(messenger_type)
        .bind(DEFAULT_HOME_CURRENCY)
        .bind(DEFAULT_LOCALE)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, messenger_type, home_currency, locale, created_at FROM users WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn count_since(&self, since: Timestamp) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE created_at >= ?1")
            .bind(since.to_sqlite_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
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
    async fn create_if_absent_is_idempotent() {
        let repo = SqliteUserRepository::new(pool().await);

        assert!(repo.create_if_absent("slack_U1", "slack").await.unwrap());
        assert!(!repo.create_if_absent("slack_U1", "slack").await.unwrap());

        let user = repo.get_by_id("slack_U1").await.unwrap().unwrap();
        assert_eq!(user.home_currency, "TWD");
    }

    #[tokio::test]
    async fn concurrent_signups_create_exactly_one_user() {
        let pool = pool().await;
        let repo = std::sync::Arc::new(SqliteUserRepository::new(pool));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.create_if_absent("telegram_42", "telegram").await
            }));
        }

        let mut created_count = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                created_count += 1;
            }
        }

        assert_eq!(created_count, 1);
    }

    #[tokio::test]
    async fn count_since_excludes_users_created_before_the_cutoff() {
        let repo = SqliteUserRepository::new(pool().await);
        repo.create_if_absent("slack_U1", "slack").await.unwrap();

        let future_cutoff = Timestamp::from_utc(chrono::Utc::now() + chrono::Duration::days(1));
        assert_eq!(repo.count_since(future_cutoff).await.unwrap(), 0);

        let past_cutoff = Timestamp::from_utc(chrono::Utc::now() - chrono::Duration::days(1));
        assert_eq!(repo.count_since(past_cutoff).await.unwrap(), 1);
    }
}
