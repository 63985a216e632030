//! AutoSignup.
//!
//! Idempotent: if the user already exists, returns success without
//! modification. Otherwise inserts the user and seeds default categories.
//! Safe for racing callers — the user insert's unique-key conflict and the
//! category seed's `(user_id, name)` unique constraint both resolve races
//! without a coordinating lock.

use crate::domain::category::CategoryRepository;
use crate::domain::user::{User, UserRepository};
use crate::error::Result;

pub struct SignupOutcome {
    pub user: User,
    pub created: bool,
}

pub async fn auto_signup(
    users: &dyn UserRepository,
    categories: &dyn CategoryRepository,
    user_id: &str,
    messenger_type: &str,
) -> Result<SignupOutcome> {
    let created = users.create_if_absent(user_id, messenger_type).await?;

    // Seeding is idempotent on its own (ON CONFLICT DO NOTHING per row), so
    // it's safe to call even when `created` is false — covers the case
    // where a prior signup attempt created the user but was interrupted
    // before seeding ran.
    categories.seed_defaults(user_id).await?;

    let user = users
        .get_by_id(user_id)
        .await?
        .expect("user row must exist immediately after create_if_absent/seed_defaults");

    Ok(SignupOutcome { user, created })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::SqliteCategoryRepository;
    use crate::domain::user::SqliteUserRepository;
    use sqlx::SqlitePool;
    use std::sync::Arc;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn second_signup_is_a_no_op_success() {
        let pool = pool().await;
        let users = SqliteUserRepository::new(pool.clone());
        let categories = SqliteCategoryRepository::new(pool);

        let first = auto_signup(&users, &categories, "slack_U1", "slack").await.unwrap();
        let second = auto_signup(&users, &categories, "slack_U1", "slack").await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(categories.get_by_user("slack_U1").await.unwrap().len(), crate::domain::category::DEFAULT_CATEGORIES.len());
    }

    #[tokio::test]
    async fn concurrent_signups_create_exactly_one_category_set() {
        let pool = pool().await;
        let users = Arc::new(SqliteUserRepository::new(pool.clone()));
        let categories = Arc::new(SqliteCategoryRepository::new(pool));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let users = users.clone();
            let categories = categories.clone();
            handles.push(tokio::spawn(async move {
                auto_signup(users.as_ref(), categories.as_ref(), "telegram_7", "telegram").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(
            categories.get_by_user("telegram_7").await.unwrap().len(),
            crate::domain::category::DEFAULT_CATEGORIES.len()
        );
    }
}
