//! Category and CategoryKeyword entities.
//!
//! Categories are seeded automatically on first signup from
//! [`DEFAULT_CATEGORIES`]; keywords drive the regex fallback path's category
//! assignment (highest `priority` match wins — see `usecases::regex_fallback`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::ids::{self, CATEGORY_KEYWORD_PREFIX, CATEGORY_PREFIX};
use crate::types::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub is_default: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryKeyword {
    pub id: String,
    pub category_id: String,
    pub keyword: String,
    pub priority: i64,
    pub created_at: Timestamp,
}

/// Seeded for every new user on `AutoSignup`, paired with keywords used by
/// the regex fallback classifier.
pub const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("Food", &["lunch", "dinner", "breakfast", "coffee", "restaurant"]),
    ("Transport", &["taxi", "uber", "bus", "mrt", "train", "gas"]),
    ("Groceries", &["grocery", "supermarket", "market"]),
    ("Entertainment", &["movie", "netflix", "game", "concert"]),
    ("Utilities", &["electricity", "water", "internet", "phone bill"]),
    ("Other", &[]),
];

/// Category name returned when no keyword matches, matching `ai::UNCATEGORIZED`.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Scans `keywords` (already ordered by `priority DESC`) for the first
/// whose text appears in `description`, case-insensitively. Pure function
/// so it can be tested without a database.
pub fn suggest_category_from_keywords(description: &str, keywords: &[CategoryKeyword]) -> Option<String> {
    let lower = description.to_lowercase();
    keywords
        .iter()
        .find(|k| lower.contains(&k.keyword.to_lowercase()))
        .map(|k| k.category_id.clone())
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn seed_defaults(&self, user_id: &str) -> Result<Vec<Category>>;
    async fn get_by_user(&self, user_id: &str) -> Result<Vec<Category>>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Category>>;
    async fn get_by_user_and_name(&self, user_id: &str, name: &str) -> Result<Option<Category>>;
    async fn keywords_for_user(&self, user_id: &str) -> Result<Vec<CategoryKeyword>>;
}

pub struct SqliteCategoryRepository {
    pool: SqlitePool,
}

impl SqliteCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn seed_defaults(&self, user_id: &str) -> Result<Vec<Category>> {
        let now = Timestamp::now();
        let now_sql = now.to_sqlite_string();
        let mut created = Vec::with_capacity(DEFAULT_CATEGORIES.len());

        let mut tx = self.pool.begin().await?;
        for (name, keywords) in DEFAULT_CATEGORIES {
            let category_id = ids::generate_id(CATEGORY_PREFIX, &[user_id, name]);
            sqlx::query(
                "INSERT INTO categories (id, user_id, name, is_default, created_at) \
                 VALUES (?1, ?2, ?3, 1, ?4) ON CONFLICT (user_id, name) DO NOTHING",
            )
            .bind(&category_id)
            .bind(user_id)
            .bind(name)
            .bind(&now_sql)
            .execute(&mut *tx)
            .await?;

            for (priority, keyword) in keywords.iter().enumerate() {
                let keyword_id = ids::generate_id(CATEGORY_KEYWORD_PREFIX, &[&category_id, keyword]);
                sqlx::query(
                    "INSERT INTO category_keywords (id, category_id, keyword, priority, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT (id) DO NOTHING",
                )
                .bind(&keyword_id)
                .bind(&category_id)
                .bind(keyword)
                .bind(priority as i64)
                .bind(&now_sql)
                .execute(&mut *tx)
                .await?;
            }

            created.push(Category {
                id: category_id,
                user_id: user_id.to_string(),
                name: name.to_string(),
                is_default: true,
                created_at: now,
            });
        }
        tx.commit().await?;

        Ok(created)
    }

    async fn get_by_user(&self, user_id: &str) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, user_id, name, is_default, created_at FROM categories WHERE user_id = ?1 ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, user_id, name, is_default, created_at FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn get_by_user_and_name(&self, user_id: &str, name: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, user_id, name, is_default, created_at FROM categories WHERE user_id = ?1 AND name = ?2",
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn keywords_for_user(&self, user_id: &str) -> Result<Vec<CategoryKeyword>> {
        let keywords = sqlx::query_as::<_, CategoryKeyword>(
            "SELECT k.id, k.category_id, k.keyword, k.priority, k.created_at \
             FROM category_keywords k \
             JOIN categories c ON c.id = k.category_id \
             WHERE c.user_id = ?1 \
             ORDER BY k.priority DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(keywords)
    }
}
