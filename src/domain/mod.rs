//! Domain entities and repository contracts.
//!
//! Each submodule owns one entity: its struct, its repository trait, and a
//! single SQLite-backed implementation. Repositories are side-effect-only on
//! their declared table — they never write audit logs themselves, per the
//! contract in the design doc; that's the use-case layer's job
//! (`usecases::cost_ledger`, `usecases::parse_conversation`).
//!
//! Construction is explicit dependency injection (a `Repos` bundle built at
//! startup), not a service locator.

pub mod ai_cost_log;
pub mod category;
pub mod exchange_rate;
pub mod expense;
pub mod interaction_log;
pub mod policy;
pub mod pricing;
pub mod short_link;
pub mod user;

use sqlx::SqlitePool;
use std::sync::Arc;

/// The full set of repositories, constructed once at startup and cloned
/// (cheaply — it's an `Arc` bundle) into every use-case call.
#[derive(Clone)]
pub struct Repos {
    pub users: Arc<dyn user::UserRepository>,
    pub categories: Arc<dyn category::CategoryRepository>,
    pub expenses: Arc<dyn expense::ExpenseRepository>,
    pub exchange_rates: Arc<dyn exchange_rate::ExchangeRateRepository>,
    pub pricing: Arc<dyn pricing::PricingRepository>,
    pub ai_cost_logs: Arc<dyn ai_cost_log::AiCostLogRepository>,
    pub interaction_logs: Arc<dyn interaction_log::InteractionLogRepository>,
    pub short_links: Arc<dyn short_link::ShortLinkRepository>,
    pub policies: Arc<dyn policy::PolicyRepository>,
}

impl Repos {
    /// Wire up the SQLite-backed implementation of every repository against
    /// a shared pool.
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            users: Arc::new(user::SqliteUserRepository::new(pool.clone())),
            categories: Arc::new(category::SqliteCategoryRepository::new(pool.clone())),
            expenses: Arc::new(expense::SqliteExpenseRepository::new(pool.clone())),
            exchange_rates: Arc::new(exchange_rate::SqliteExchangeRateRepository::new(pool.clone())),
            pricing: Arc::new(pricing::SqlitePricingRepository::new(pool.clone())),
            ai_cost_logs: Arc::new(ai_cost_log::SqliteAiCostLogRepository::new(pool.clone())),
            interaction_logs: Arc::new(interaction_log::SqliteInteractionLogRepository::new(pool.clone())),
            short_links: Arc::new(short_link::SqliteShortLinkRepository::new(pool.clone())),
            policies: Arc::new(policy::SqlitePolicyRepository::new(pool)),
        }
    }
}
