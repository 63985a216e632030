//! Pricing registry & sync engine.
//!
//! `PricingProvider` is the pluggable fetch interface; `sync` runs the
//! retry-then-diff-then-write protocol against one provider at a time,
//! holding a per-provider `tokio::sync::Mutex` for the documented operator
//! convention ("one sync per provider in flight").

pub mod backoff;
pub mod state_machine;
pub mod static_table;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::pricing::{NewPricingConfig, PricingConfig, PricingRepository};
use crate::error::{Error, Result};
use crate::pricing::backoff::retry_with_backoff;
use crate::pricing::state_machine::{decide_action, Action};

pub use static_table::StaticTablePricingProvider;

/// One (provider, model) price point as fetched from upstream, before any
/// diffing against the current registry state.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPrice {
    pub provider: String,
    pub model: String,
    pub input_token_price: f64,
    pub output_token_price: f64,
}

#[async_trait]
pub trait PricingProvider: Send + Sync {
    async fn fetch(&self) -> Result<Vec<FetchedPrice>>;

    fn provider_name(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub provider: String,
    pub synced_at: DateTime<Utc>,
    pub models_updated: usize,
    pub models_unchanged: usize,
    pub errors: Vec<String>,
    pub updated_configs: Vec<PricingConfig>,
}

/// Registry of providers plus the per-provider mutex guarding concurrent
/// sync invocations for the same provider.
pub struct PricingSyncEngine {
    providers: HashMap<String, Arc<dyn PricingProvider>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PricingSyncEngine {
    pub fn new(providers: Vec<Arc<dyn PricingProvider>>) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.provider_name().to_string(), p))
            .collect();
        Self {
            providers,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    async fn lock_for(&self, provider: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs the sync protocol in spec.md's §4.D ordering: fetch with retry,
    /// then for each fetched price, deactivate-then-insert or skip.
    pub async fn sync(&self, provider: &str, repo: &dyn PricingRepository) -> Result<SyncResult> {
        let provider_impl = self
            .providers
            .get(provider)
            .ok_or_else(|| Error::BadRequest(format!("unknown pricing provider: {provider}")))?
            .clone();

        let lock = self.lock_for(provider).await;
        let _guard = lock.lock().await;

        let synced_at = Utc::now();
        let fetched = match retry_with_backoff(|| {
            let provider_impl = provider_impl.clone();
            async move { provider_impl.fetch().await }
        })
        .await
        {
            Ok(prices) => prices,
            Err(e) => {
                return Ok(SyncResult {
                    success: false,
                    provider: provider.to_string(),
                    synced_at,
                    models_updated: 0,
                    models_unchanged: 0,
                    errors: vec![e.to_string()],
                    updated_configs: Vec::new(),
                })
            }
        };

        // Tie-break: last occurrence of a duplicate (provider, model) wins.
        let mut by_key: HashMap<(String, String), FetchedPrice> = HashMap::new();
        for price in fetched {
            by_key.insert((price.provider.clone(), price.model.clone()), price);
        }

        let mut models_updated = 0;
        let mut models_unchanged = 0;
        let mut errors = Vec::new();
        let mut updated_configs = Vec::new();

        for (_, price) in by_key {
            let current = match repo.get_by_provider_and_model(&price.provider, &price.model).await {
                Ok(current) => current,
                Err(e) => {
                    errors.push(format!("{}/{}: {e}", price.provider, price.model));
                    continue;
                }
            };

            let action = decide_action(&price, current.as_ref());
            match action {
                Action::Skip => models_unchanged += 1,
                Action::Insert | Action::DeactivateThenInsert => {
                    if action == Action::DeactivateThenInsert {
                        if let Err(e) = repo.deactivate(&price.provider, &price.model).await {
                            errors.push(format!("{}/{} deactivate: {e}", price.provider, price.model));
                            continue;
                        }
                    }

                    match repo
                        .insert(NewPricingConfig {
                            provider: price.provider.clone(),
                            model: price.model.clone(),
                            input_token_price: price.input_token_price,
                            output_token_price: price.output_token_price,
                            currency: "USD".to_string(),
                            effective_date: synced_at,
                        })
                        .await
                    {
                        Ok(config) => {
                            models_updated += 1;
                            updated_configs.push(config);
                        }
                        Err(e) => {
                            warn!(provider = %price.provider, model = %price.model, error = %e, "pricing insert failed");
                            errors.push(format!("{}/{} insert: {e}", price.provider, price.model));
                        }
                    }
                }
            }
        }

        Ok(SyncResult {
            success: true,
            provider: provider.to_string(),
            synced_at,
            models_updated,
            models_unchanged,
            errors,
            updated_configs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::SqlitePricingRepository;
    use sqlx::SqlitePool;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticProvider(Vec<FetchedPrice>);

    #[async_trait]
    impl PricingProvider for StaticProvider {
        async fn fetch(&self) -> Result<Vec<FetchedPrice>> {
            Ok(self.0.clone())
        }

        fn provider_name(&self) -> &str {
            "openai"
        }
    }

    struct FlakyProvider {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl PricingProvider for FlakyProvider {
        async fn fetch(&self) -> Result<Vec<FetchedPrice>> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                return Err(Error::Transient("upstream flaky".to_string()));
            }
            Ok(vec![FetchedPrice {
                provider: "openai".to_string(),
                model: "gpt-4o".to_string(),
                input_token_price: 0.001,
                output_token_price: 0.002,
            }])
        }

        fn provider_name(&self) -> &str {
            "openai"
        }
    }

    async fn pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn price(model: &str, input: f64) -> FetchedPrice {
        FetchedPrice {
            provider: "openai".to_string(),
            model: model.to_string(),
            input_token_price: input,
            output_token_price: input * 2.0,
        }
    }

    #[tokio::test]
    async fn first_run_inserts_all_models() {
        let repo = SqlitePricingRepository::new(pool().await);
        let engine = PricingSyncEngine::new(vec![Arc::new(StaticProvider(vec![
            price("gpt-4o", 0.001),
            price("gpt-4o-mini", 0.0002),
            price("gpt-4-turbo", 0.002),
        ]))]);

        let result = engine.sync("openai", &repo).await.unwrap();
        assert!(result.success);
        assert_eq!(result.models_updated, 3);
        assert_eq!(result.models_unchanged, 0);
    }

    #[tokio::test]
    async fn rerun_with_no_changes_is_fully_unchanged() {
        let repo = SqlitePricingRepository::new(pool().await);
        let prices = vec![price("gpt-4o", 0.001), price("gpt-4o-mini", 0.0002), price("gpt-4-turbo", 0.002)];
        let engine = PricingSyncEngine::new(vec![Arc::new(StaticProvider(prices.clone()))]);

        engine.sync("openai", &repo).await.unwrap();
        let second = engine.sync("openai", &repo).await.unwrap();

        assert_eq!(second.models_updated, 0);
        assert_eq!(second.models_unchanged, 3);
    }

    #[tokio::test]
    async fn one_model_changing_leaves_exactly_one_active_row() {
        let repo = SqlitePricingRepository::new(pool().await);
        let initial = vec![price("gpt-4o", 0.001), price("gpt-4o-mini", 0.0002), price("gpt-4-turbo", 0.002)];
        let engine = PricingSyncEngine::new(vec![Arc::new(StaticProvider(initial))]);
        engine.sync("openai", &repo).await.unwrap();

        let changed = vec![price("gpt-4o", 0.0015), price("gpt-4o-mini", 0.0002), price("gpt-4-turbo", 0.002)];
        let engine2 = PricingSyncEngine::new(vec![Arc::new(StaticProvider(changed))]);
        let result = engine2.sync("openai", &repo).await.unwrap();

        assert_eq!(result.models_updated, 1);
        assert_eq!(result.models_unchanged, 2);

        let history = repo.history("openai", "gpt-4o").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().filter(|c| c.is_active).count(), 1);
    }

    #[tokio::test]
    async fn unknown_provider_is_a_bad_request() {
        let repo = SqlitePricingRepository::new(pool().await);
        let engine = PricingSyncEngine::new(vec![]);
        let err = engine.sync("does-not-exist", &repo).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_fetch_failures_before_succeeding() {
        let repo = SqlitePricingRepository::new(pool().await);
        let engine = PricingSyncEngine::new(vec![Arc::new(FlakyProvider { attempts: AtomicUsize::new(0) })]);
        let result = engine.sync("openai", &repo).await.unwrap();
        assert!(result.success);
        assert_eq!(result.models_updated, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_fetch_failure_makes_no_writes() {
        struct AlwaysFails;

        #[async_trait]
        impl PricingProvider for AlwaysFails {
            async fn fetch(&self) -> Result<Vec<FetchedPrice>> {
                Err(Error::Transient("down".to_string()))
            }
            fn provider_name(&self) -> &str {
                "openai"
            }
        }

        let repo = SqlitePricingRepository::new(pool().await);
        let engine = PricingSyncEngine::new(vec![Arc::new(AlwaysFails)]);
        let result = engine.sync("openai", &repo).await.unwrap();
        assert!(!result.success);
        assert!(repo.history("openai", "gpt-4o").await.unwrap().is_empty());
    }
}
