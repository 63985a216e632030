//! AI cost ledger.
//!
//! Called after every `ParseExpense`/`SuggestCategory`. Pricing lookup and
//! the log write are both best-effort: a missing price or a write failure
//! is logged and swallowed so the parent conversational operation always
//! succeeds from the caller's point of view.

use tracing::warn;

use crate::ai::TokenMetadata;
use crate::domain::ai_cost_log::{AiCostLogRepository, NewAiCostLog};
use crate::domain::pricing::PricingRepository;

pub async fn record_cost(
    ai_cost_logs: &dyn AiCostLogRepository,
    pricing: &dyn PricingRepository,
    user_id: &str,
    operation: &str,
    provider: &str,
    model: &str,
    tokens: TokenMetadata,
) {
    let cost = match pricing.get_by_provider_and_model(provider, model).await {
        Ok(Some(config)) => {
            tokens.input_tokens as f64 * config.input_token_price
                + tokens.output_tokens as f64 * config.output_token_price
        }
        Ok(None) => {
            warn!(provider, model, "no active pricing config, logging cost as 0");
            0.0
        }
        Err(e) => {
            warn!(provider, model, error = %e, "pricing lookup failed, logging cost as 0");
            0.0
        }
    };

    let result = ai_cost_logs
        .record(NewAiCostLog {
            user_id: user_id.to_string(),
            operation: operation.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            input_tokens: tokens.input_tokens,
            output_tokens: tokens.output_tokens,
            cost,
            currency: "USD".to_string(),
        })
        .await;

    if let Err(e) = result {
        warn!(user_id, operation, error = %e, "failed to write ai cost log");
    }
}
