//! Telegram adapter.
//!
//! Presumed trusted network (webhook secret path) or an optional shared
//! token compared constant-time — Telegram itself has no request-signing
//! scheme. Body: a single `Update` object.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::messengers::signature::verify_telegram;
use crate::messengers::{ConversationType, MessengerAdapter, Platform, UserMessage};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn verify(configured_token: Option<&str>, provided_token: Option<&str>) -> Result<()> {
    verify_telegram(configured_token, provided_token)
}

pub fn decode(body: &[u8]) -> Result<Option<UserMessage>> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| Error::BadRequest(format!("invalid telegram payload: {e}")))?;

    let Some(message) = payload.get("message") else {
        return Ok(None);
    };
    let Some(text) = message.get("text").and_then(Value::as_str) else {
        return Ok(None);
    };
    let Some(user_id) = message.pointer("/from/id").and_then(Value::as_i64) else {
        return Ok(None);
    };
    let Some(chat_id) = message.pointer("/chat/id").and_then(Value::as_i64) else {
        return Ok(None);
    };
    let is_bot_msg = message.pointer("/from/is_bot").and_then(Value::as_bool).unwrap_or(false);
    let is_group = message.pointer("/chat/type").and_then(Value::as_str) != Some("private");

    Ok(Some(UserMessage {
        platform: Platform::Telegram,
        external_user_id: user_id.to_string(),
        text: text.to_string(),
        reply_handle: chat_id.to_string(),
        is_bot_msg,
        conversation_type: if is_group { ConversationType::Channel } else { ConversationType::Direct },
    }))
}

pub struct TelegramAdapter {
    http: reqwest::Client,
    bot_token: String,
}

impl TelegramAdapter {
    pub fn new(bot_token: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REPLY_TIMEOUT)
            .build()
            .map_err(Error::Reqwest)?;
        Ok(Self { http, bot_token })
    }
}

#[async_trait]
impl MessengerAdapter for TelegramAdapter {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    async fn send(&self, reply_handle: &str, text: &str) -> Result<()> {
        self.http
            .post(format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token))
            .json(&serde_json::json!({ "chat_id": reply_handle, "text": text }))
            .send()
            .await
            .map_err(Error::Reqwest)?;
        Ok(())
    }
}
