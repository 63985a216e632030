//! ParseConversation.
//!
//! Drives the AI client with a deterministic regex fallback, resolves each
//! parsed item's relative date expression against `now`, and records the
//! interaction/cost logs as a best-effort side effect — a log write failure
//! must never fail the conversational turn itself.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::ai::{AiClient, ParsedExpense, TokenMetadata};
use crate::domain::ai_cost_log::AiCostLogRepository;
use crate::domain::interaction_log::{InteractionLogRepository, NewInteractionLog};
use crate::domain::pricing::PricingRepository;
use crate::domain::user::User;
use crate::usecases::cost_ledger::record_cost;
use crate::usecases::regex_fallback::parse_expense_regex;

pub struct ParsedConversationItem {
    pub amount: f64,
    pub description: String,
    pub currency: Option<String>,
    pub resolved_date: DateTime<Utc>,
}

pub async fn parse_conversation(
    ai_client: Option<&dyn AiClient>,
    interaction_logs: &dyn InteractionLogRepository,
    ai_cost_logs: &dyn AiCostLogRepository,
    pricing: &dyn PricingRepository,
    user: &User,
    text: &str,
) -> Vec<ParsedConversationItem> {
    let started = Utc::now();
    let system_prompt = format!(
        "user locale={}, home_currency={}",
        user.locale, user.home_currency
    );

    let (raw, tokens, error) = match ai_client {
        Some(client) => match client.parse_expense(text, &user.user_id).await {
            Ok((parsed, tokens)) => (parsed, Some(tokens), None),
            Err(e) => {
                warn!(user_id = %user.user_id, error = %e, "ai parse failed, using regex fallback");
                (parse_expense_regex(text), None, Some(e.to_string()))
            }
        },
        None => (parse_expense_regex(text), None, None),
    };

    let duration_ms = (Utc::now() - started).num_milliseconds();
    let bot_final_reply = if raw.is_empty() {
        "I couldn't find any expenses in that message.".to_string()
    } else {
        format!("Found {} expense(s).", raw.len())
    };

    let log_result = interaction_logs
        .record(NewInteractionLog {
            user_id: user.user_id.clone(),
            user_input: text.to_string(),
            system_prompt: Some(system_prompt),
            ai_raw_response: None,
            bot_final_reply,
            duration_ms,
            error,
        })
        .await;
    if let Err(e) = log_result {
        warn!(user_id = %user.user_id, error = %e, "failed to write interaction log");
    }

    if let (Some(client), Some(tokens)) = (ai_client, tokens) {
        record_cost(
            ai_cost_logs,
            pricing,
            &user.user_id,
            "parse_expense",
            client.provider(),
            client.model(),
            tokens,
        )
        .await;
    }

    raw.into_iter()
        .map(|item| resolve_item(item, started))
        .collect()
}

fn resolve_item(item: ParsedExpense, now: DateTime<Utc>) -> ParsedConversationItem {
    let resolved_date = item
        .date_hint
        .as_deref()
        .and_then(|hint| resolve_date_hint(hint, now))
        .unwrap_or(now);

    ParsedConversationItem {
        amount: item.amount,
        description: item.description,
        currency: item.currency,
        resolved_date,
    }
}

/// Resolves a handful of common relative-date expressions. Anything else
/// (including an absent hint) defaults to `now` at the call site.
fn resolve_date_hint(hint: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match hint.to_lowercase().trim() {
        "today" => Some(now),
        "yesterday" => Some(now - Duration::days(1)),
        "last week" => Some(now - Duration::weeks(1)),
        _ => None,
    }
}
