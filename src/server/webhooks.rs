//! Webhook handlers for the six messenger platforms (the ingestion pipeline's HTTP
//! edge). Each handler follows the same five-step contract documented in
//! `messengers`: read the raw body, authenticate, handle any
//! URL-verification/PING shortcut, decode, then acknowledge the platform
//! within its budget while the use-case work (signup, parse, expense
//! creation, reply) runs in a spawned task.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde_json::{json, Value};

use crate::domain::category::suggest_category_from_keywords;
use crate::messengers::{self, MessengerAdapter, Platform, UserMessage, WebhookShortcut};
use crate::server::state::AppState;
use crate::usecases::expense::{create_expense, CreateExpenseInput};
use crate::usecases::parse_conversation::parse_conversation;
use crate::usecases::signup::auto_signup;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

/// Runs `AutoSignup`, `ParseConversation`, and `CreateExpense` for every
/// parsed item, then replies once with a combined confirmation. Errors at
/// any stage are logged and swallowed — per the adapter contract, a
/// downstream failure must never surface as a webhook-level error.
async fn process_user_message(state: AppState, platform: Platform, msg: UserMessage) {
    if msg.is_bot_msg {
        return;
    }

    let adapter = state.adapter_for(platform);
    let user_id = msg.namespaced_user_id();

    if let Err(e) = auto_signup(&*state.repos.users, &*state.repos.categories, &user_id, platform.as_str()).await {
        tracing::warn!(user_id = %user_id, error = %e, "auto-signup failed");
        return;
    }

    let user = match state.repos.users.get_by_id(&user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::error!(user_id = %user_id, "user missing immediately after auto-signup");
            return;
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "failed to load user");
            return;
        }
    };

    let items = parse_conversation(
        state.ai_client.as_deref(),
        &*state.repos.interaction_logs,
        &*state.repos.ai_cost_logs,
        &*state.repos.pricing,
        &user,
        &msg.text,
    )
    .await;

    let Some(adapter) = adapter else {
        return;
    };

    if items.is_empty() {
        let _ = adapter.send(&msg.reply_handle, "I couldn't find any expenses in that message.").await;
        return;
    }

    let keywords = state.repos.categories.keywords_for_user(&user_id).await.unwrap_or_default();
    let mut confirmations = Vec::with_capacity(items.len());

    for item in items {
        let suggested_category_id = suggest_category_from_keywords(&item.description, &keywords);
        let input = CreateExpenseInput {
            user_id: user_id.clone(),
            description: item.description.clone(),
            original_amount: item.amount,
            currency: item.currency.clone(),
            category_id: None,
            expense_date: Some(item.resolved_date),
            account: None,
        };

        match create_expense(
            &*state.repos.users,
            &*state.repos.categories,
            &*state.repos.exchange_rates,
            &*state.repos.expenses,
            input,
            suggested_category_id,
        )
        .await
        {
            Ok(result) => confirmations.push(result.confirmation_text),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "create_expense failed");
                confirmations.push(format!("Couldn't log \"{}\": try again later", item.description));
            }
        }
    }

    let _ = adapter.send(&msg.reply_handle, &confirmations.join("\n")).await;
}

pub async fn line(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(secret) = state.credentials.line_channel_secret.as_ref() else {
        return (StatusCode::BAD_REQUEST, "line adapter not configured").into_response();
    };
    if messengers::line::verify(secret, &body, header(&headers, "x-line-signature")).is_err() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let messages = match messengers::line::decode(&body) {
        Ok(messages) => messages,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    for msg in messages {
        tokio::spawn(process_user_message(state.clone(), Platform::Line, msg));
    }
    StatusCode::OK.into_response()
}

pub async fn telegram(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let provided = headers.get("x-telegram-bot-api-secret-token").and_then(|v| v.to_str().ok());
    if messengers::telegram::verify(state.credentials.telegram_secret_token.as_deref(), provided).is_err() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match messengers::telegram::decode(&body) {
        Ok(Some(msg)) => {
            tokio::spawn(process_user_message(state.clone(), Platform::Telegram, msg));
            StatusCode::OK.into_response()
        }
        Ok(None) => StatusCode::OK.into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

pub async fn discord(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(public_key) = state.credentials.discord_public_key.as_ref() else {
        return (StatusCode::BAD_REQUEST, "discord adapter not configured").into_response();
    };
    let timestamp = header(&headers, "x-signature-timestamp");
    let signature = header(&headers, "x-signature-ed25519");
    if messengers::discord::verify(public_key, &body, timestamp, signature).is_err() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match messengers::discord::shortcut(&body) {
        Ok(Some(WebhookShortcut::Pong)) => return Json(json!({ "type": 1 })).into_response(),
        Ok(_) => {}
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    }

    match messengers::discord::decode(&body) {
        Ok(Some(msg)) => {
            tokio::spawn(process_user_message(state.clone(), Platform::Discord, msg));
            // Deferred channel message: Discord requires an ack within 3s;
            // the real content arrives later via the adapter's followup call.
            Json(json!({ "type": 5 })).into_response()
        }
        Ok(None) => StatusCode::OK.into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

pub async fn whatsapp_verify(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let Some(verify_token) = state.credentials.whatsapp_verify_token.as_ref() else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let shortcut = messengers::whatsapp::verify_subscription(
        verify_token,
        params.get("hub.mode").map(String::as_str),
        params.get("hub.verify_token").map(String::as_str),
        params.get("hub.challenge").map(String::as_str),
    );
    match shortcut {
        Ok(WebhookShortcut::Challenge(challenge)) => (StatusCode::OK, challenge).into_response(),
        _ => StatusCode::FORBIDDEN.into_response(),
    }
}

pub async fn whatsapp(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(app_secret) = state.credentials.whatsapp_app_secret.as_ref() else {
        return (StatusCode::BAD_REQUEST, "whatsapp adapter not configured").into_response();
    };
    if messengers::whatsapp::verify(app_secret, &body, header(&headers, "x-hub-signature-256")).is_err() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let messages = match messengers::whatsapp::decode(&body) {
        Ok(messages) => messages,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    for msg in messages {
        tokio::spawn(process_user_message(state.clone(), Platform::WhatsApp, msg));
    }
    StatusCode::OK.into_response()
}

pub async fn slack(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(signing_secret) = state.credentials.slack_signing_secret.as_ref() else {
        return (StatusCode::BAD_REQUEST, "slack adapter not configured").into_response();
    };
    let timestamp = header(&headers, "x-slack-request-timestamp");
    let signature = header(&headers, "x-slack-signature");
    if messengers::slack::verify(signing_secret, &body, timestamp, signature, Utc::now().timestamp()).is_err() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    if let Some(WebhookShortcut::Challenge(challenge)) = messengers::slack::shortcut(&payload) {
        return Json(json!({ "challenge": challenge })).into_response();
    }

    match messengers::slack::decode(&body) {
        Ok(Some(msg)) => {
            tokio::spawn(process_user_message(state.clone(), Platform::Slack, msg));
            StatusCode::OK.into_response()
        }
        Ok(None) => StatusCode::OK.into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

pub async fn teams(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(app_password) = state.credentials.teams_app_password.as_ref() else {
        return (StatusCode::BAD_REQUEST, "teams adapter not configured").into_response();
    };
    if messengers::teams::verify(app_password, &body, header(&headers, "authorization")).is_err() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match messengers::teams::decode(&body) {
        Ok(Some(msg)) => {
            tokio::spawn(process_user_message(state.clone(), Platform::Teams, msg));
            StatusCode::OK.into_response()
        }
        Ok(None) => StatusCode::OK.into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}
