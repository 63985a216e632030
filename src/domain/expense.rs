//! Expense entity and repository.
//!
//! Invariants enforced by the use-case layer before calling `create`
//! (repositories are side-effect-only, they don't re-validate):
//! `original_amount * exchange_rate ≈ home_amount`, `home_currency` equals
//! the owning user's `home_currency` at creation time, `exchange_rate >= 0`,
//! `expense_date <= now + 1 day`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::ids::{self, EXPENSE_PREFIX};
use crate::types::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Expense {
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub original_amount: f64,
    pub currency: String,
    pub home_amount: f64,
    pub home_currency: String,
    pub exchange_rate: f64,
    pub category_id: Option<String>,
    pub account: String,
    pub expense_date: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Fields required to persist a new expense; `id`/`created_at`/`updated_at`
/// are assigned by the repository.
pub struct NewExpense {
    pub user_id: String,
    pub description: String,
    pub original_amount: f64,
    pub currency: String,
    pub home_amount: f64,
    pub home_currency: String,
    pub exchange_rate: f64,
    pub category_id: Option<String>,
    pub account: String,
    pub expense_date: DateTime<Utc>,
}

pub const DEFAULT_ACCOUNT: &str = "Cash";

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn create(&self, new: NewExpense) -> Result<Expense>;

    /// Rows whose `expense_date` lies in `[from, to]` inclusive.
    async fn get_by_user_id_and_date_range(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Expense>>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Expense>>;
}

pub struct SqliteExpenseRepository {
    pool: SqlitePool,
}

impl SqliteExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExpenseRepository for SqliteExpenseRepository {
    async fn create(&self, new: NewExpense) -> Result<Expense> {
        let now = Timestamp::now();
        let expense_date = Timestamp::from_utc(new.expense_date);
        let id = ids::generate_id(
            EXPENSE_PREFIX,
            &[
                &new.user_id,
                &new.description,
                &expense_date.to_sqlite_string(),
                &now.to_sqlite_string(),
            ],
        );

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, user_id, description, original_amount, currency,
                home_amount, home_currency, exchange_rate, category_id,
                account, expense_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&id)
        .bind(&new.user_id)
        .bind(&new.description)
        .bind(new.original_amount)
        .bind(&new.currency)
        .bind(new.home_amount)
        .bind(&new.home_currency)
        .bind(new.exchange_rate)
        .bind(&new.category_id)
        .bind(&new.account)
        .bind(expense_date.to_sqlite_string())
        .bind(now.to_sqlite_string())
        .bind(now.to_sqlite_string())
        .execute(&self.pool)
        .await?;

        Ok(Expense {
            id,
            user_id: new.user_id,
            description: new.description,
            original_amount: new.original_amount,
            currency: new.currency,
            home_amount: new.home_amount,
            home_currency: new.home_currency,
            exchange_rate: new.exchange_rate,
            category_id: new.category_id,
            account: new.account,
            expense_date,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_user_id_and_date_range(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Expense>> {
        let from = Timestamp::from_utc(from).to_sqlite_string();
        let to = Timestamp::from_utc(to).to_sqlite_string();

        let expenses = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, user_id, description, original_amount, currency,
                   home_amount, home_currency, exchange_rate, category_id,
                   account, expense_date, created_at, updated_at
            FROM expenses
            WHERE user_id = ?1 AND expense_date >= ?2 AND expense_date <= ?3
            ORDER BY expense_date ASC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Expense>> {
        let expense = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, user_id, description, original_amount, currency,
                   home_amount, home_currency, exchange_rate, category_id,
                   account, expense_date, created_at, updated_at
            FROM expenses WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(expense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO users (user_id, messenger_type, home_currency, locale, created_at) \
             VALUES ('u1', 'slack', 'TWD', 'en', '2026-01-01 00:00:00')",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    fn sample(date: DateTime<Utc>) -> NewExpense {
        NewExpense {
            user_id: "u1".to_string(),
            description: "lunch".to_string(),
            original_amount: 12.5,
            currency: "USD".to_string(),
            home_amount: 390.0,
            home_currency: "TWD".to_string(),
            exchange_rate: 31.2,
            category_id: None,
            account: DEFAULT_ACCOUNT.to_string(),
            expense_date: date,
        }
    }

    #[tokio::test]
    async fn date_range_query_is_inclusive() {
        let repo = SqliteExpenseRepository::new(pool().await);
        let d1 = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap();
        let d3 = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();

        repo.create(sample(d1)).await.unwrap();
        repo.create(sample(d2)).await.unwrap();
        repo.create(sample(d3)).await.unwrap();

        let found = repo.get_by_user_id_and_date_range("u1", d1, d2).await.unwrap();
        assert_eq!(found.len(), 2);
    }
}
