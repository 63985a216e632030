//! The per-model pricing sync decision, isolated as a pure function so it
//! can be exhaustively tested without a database.

use crate::domain::pricing::PricingConfig;
use crate::pricing::FetchedPrice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Fetched prices match the current active row; no write.
    Skip,
    /// No active row exists yet for this `(provider, model)`.
    Insert,
    /// An active row exists with different prices: deactivate it, then
    /// insert the new one. Order matters — see the append-only invariant.
    DeactivateThenInsert,
}

pub fn decide_action(fetched: &FetchedPrice, current: Option<&PricingConfig>) -> Action {
    match current {
        None => Action::Insert,
        Some(current) => {
            if prices_equal(fetched, current) {
                Action::Skip
            } else {
                Action::DeactivateThenInsert
            }
        }
    }
}

fn prices_equal(fetched: &FetchedPrice, current: &PricingConfig) -> bool {
    floats_equal(fetched.input_token_price, current.input_token_price)
        && floats_equal(fetched.output_token_price, current.output_token_price)
}

fn floats_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn config(input: f64, output: f64) -> PricingConfig {
        PricingConfig {
            id: "pricing_x".to_string(),
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            input_token_price: input,
            output_token_price: output,
            currency: "USD".to_string(),
            effective_date: Timestamp::now(),
            is_active: true,
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        }
    }

    fn fetched(input: f64, output: f64) -> FetchedPrice {
        FetchedPrice {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            input_token_price: input,
            output_token_price: output,
        }
    }

    #[test]
    fn absent_current_row_always_inserts() {
        assert_eq!(decide_action(&fetched(0.001, 0.002), None), Action::Insert);
    }

    #[test]
    fn identical_prices_skip() {
        let current = config(0.001, 0.002);
        assert_eq!(decide_action(&fetched(0.001, 0.002), Some(&current)), Action::Skip);
    }

    #[test]
    fn changed_input_price_deactivates_then_inserts() {
        let current = config(0.001, 0.002);
        assert_eq!(decide_action(&fetched(0.0015, 0.002), Some(&current)), Action::DeactivateThenInsert);
    }

    #[test]
    fn changed_output_price_deactivates_then_inserts() {
        let current = config(0.001, 0.002);
        assert_eq!(decide_action(&fetched(0.001, 0.0025), Some(&current)), Action::DeactivateThenInsert);
    }

    #[test]
    fn floating_point_jitter_within_epsilon_still_skips() {
        let current = config(0.001, 0.002);
        assert_eq!(decide_action(&fetched(0.001 + 1e-12, 0.002), Some(&current)), Action::Skip);
    }
}
