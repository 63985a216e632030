//! A `PricingProvider` backed by a hard-coded price table.
//!
//! Stands in for providers that would otherwise scrape a pricing page or
//! call a billing API — useful as the default provider when no network
//! fetch is configured, and as the provider used by the sync engine's own
//! tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::pricing::{FetchedPrice, PricingProvider};

pub struct StaticTablePricingProvider {
    name: String,
    table: Vec<FetchedPrice>,
}

impl StaticTablePricingProvider {
    pub fn new(name: impl Into<String>, table: Vec<FetchedPrice>) -> Self {
        Self { name: name.into(), table }
    }

    /// A small built-in table for the `openai` provider, current as of
    /// this crate's initial release.
    pub fn openai_defaults() -> Self {
        Self::new(
            "openai",
            vec![
                FetchedPrice {
                    provider: "openai".to_string(),
                    model: "gpt-4o".to_string(),
                    input_token_price: 0.0000025,
                    output_token_price: 0.00001,
                },
                FetchedPrice {
                    provider: "openai".to_string(),
                    model: "gpt-4o-mini".to_string(),
                    input_token_price: 0.00000015,
                    output_token_price: 0.0000006,
                },
            ],
        )
    }
}

#[async_trait]
impl PricingProvider for StaticTablePricingProvider {
    async fn fetch(&self) -> Result<Vec<FetchedPrice>> {
        Ok(self.table.clone())
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
