//! Report generation.
//!
//! Always computed from `Expense` rows directly — no cached aggregates — so
//! a report reflects writes made moments earlier.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::category::CategoryRepository;
use crate::domain::expense::ExpenseRepository;
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
    Custom { from: DateTime<Utc>, to: DateTime<Utc> },
}

impl ReportPeriod {
    fn range(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            ReportPeriod::Daily => (now - Duration::days(1), now),
            ReportPeriod::Weekly => (now - Duration::weeks(1), now),
            ReportPeriod::Monthly => (now - Duration::days(30), now),
            ReportPeriod::Custom { from, to } => (from, to),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    pub category_name: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub by_category: Vec<CategoryTotal>,
}

pub async fn generate_report(
    expenses: &dyn ExpenseRepository,
    categories: &dyn CategoryRepository,
    user_id: &str,
    period: ReportPeriod,
) -> Result<Report> {
    let (from, to) = period.range(Utc::now());
    let rows = expenses.get_by_user_id_and_date_range(user_id, from, to).await?;

    if rows.is_empty() {
        return Ok(Report { from, to, total: 0.0, average: 0.0, min: 0.0, max: 0.0, by_category: Vec::new() });
    }

    let total: f64 = rows.iter().map(|e| e.home_amount).sum();
    let average = total / rows.len() as f64;
    let min = rows.iter().map(|e| e.home_amount).fold(f64::INFINITY, f64::min);
    let max = rows.iter().map(|e| e.home_amount).fold(f64::NEG_INFINITY, f64::max);

    let mut totals_by_category: HashMap<Option<String>, (f64, usize)> = HashMap::new();
    for expense in &rows {
        let entry = totals_by_category.entry(expense.category_id.clone()).or_insert((0.0, 0));
        entry.0 += expense.home_amount;
        entry.1 += 1;
    }

    let mut by_category = Vec::with_capacity(totals_by_category.len());
    for (category_id, (total, count)) in totals_by_category {
        let category_name = match category_id {
            Some(id) => categories
                .get_by_id(&id)
                .await?
                .map(|c| c.name)
                .unwrap_or_else(|| "uncategorized".to_string()),
            None => "uncategorized".to_string(),
        };
        by_category.push(CategoryTotal { category_name, total, count });
    }
    by_category.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap());

    Ok(Report { from, to, total, average, min, max, by_category })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::SqliteCategoryRepository;
    use crate::domain::expense::{NewExpense, SqliteExpenseRepository, DEFAULT_ACCOUNT};
    use sqlx::SqlitePool;

    async fn pool_with_user() -> SqlitePool {
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

    fn expense(amount: f64) -> NewExpense {
        NewExpense {
            user_id: "u1".to_string(),
            description: "item".to_string(),
            original_amount: amount,
            currency: "TWD".to_string(),
            home_amount: amount,
            home_currency: "TWD".to_string(),
            exchange_rate: 1.0,
            category_id: None,
            account: DEFAULT_ACCOUNT.to_string(),
            expense_date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn empty_range_yields_zeroed_report_not_an_error() {
        let pool = pool_with_user().await;
        let expenses = SqliteExpenseRepository::new(pool.clone());
        let categories = SqliteCategoryRepository::new(pool);

        let report = generate_report(&expenses, &categories, "u1", ReportPeriod::Weekly).await.unwrap();
        assert_eq!(report.total, 0.0);
        assert!(report.by_category.is_empty());
    }

    #[tokio::test]
    async fn computes_sum_average_min_max() {
        let pool = pool_with_user().await;
        let expenses = SqliteExpenseRepository::new(pool.clone());
        let categories = SqliteCategoryRepository::new(pool);

        expenses.create(expense(10.0)).await.unwrap();
        expenses.create(expense(20.0)).await.unwrap();
        expenses.create(expense(30.0)).await.unwrap();

        let report = generate_report(&expenses, &categories, "u1", ReportPeriod::Weekly).await.unwrap();
        assert_eq!(report.total, 60.0);
        assert_eq!(report.average, 20.0);
        assert_eq!(report.min, 10.0);
        assert_eq!(report.max, 30.0);
        assert_eq!(report.by_category.len(), 1);
        assert_eq!(report.by_category[0].category_name, "uncategorized");
    }
}
