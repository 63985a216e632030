//! AI client abstraction.
//!
//! Two operations — `parse_expense` and `suggest_category` — each returning
//! token usage alongside the result so the cost ledger can price the call.
//! `GeminiClient` is the one HTTP-backed implementation; `usecases::regex_fallback`
//! and the keyword scan in `domain::category` provide the deterministic paths
//! used when no provider is configured or the remote call fails.

pub mod gemini;
pub mod token_estimation;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Token accounting for a single LLM call. `estimated` is true when the
/// backend didn't report usage and we fell back to the chars/4 heuristic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct TokenMetadata {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub estimated: bool,
}

impl TokenMetadata {
    pub fn total_tokens(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }
}

/// One expense candidate extracted from free text, before currency
/// normalization or category assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedExpense {
    pub amount: f64,
    pub description: String,
    pub currency: Option<String>,
    /// Relative date expression as found in the text (e.g. "yesterday");
    /// resolution against `now` happens in `usecases::parse_conversation`.
    pub date_hint: Option<String>,
}

#[async_trait]
pub trait AiClient: Send + Sync {
    async fn parse_expense(&self, text: &str, user_id: &str) -> Result<(Vec<ParsedExpense>, TokenMetadata)>;

    async fn suggest_category(&self, description: &str, user_id: &str) -> Result<(String, TokenMetadata)>;

    fn provider(&self) -> &str;

    fn model(&self) -> &str;
}

pub const UNCATEGORIZED: &str = "uncategorized";
